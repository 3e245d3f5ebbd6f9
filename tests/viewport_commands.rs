use eframe::egui;
use glass_overlay::overlay::geometry::{IntRect, Point, Size};
use glass_overlay::overlay::session::{OverlayServices, OverlaySession};
use glass_overlay::overlay::state::DragKind;
use glass_overlay::overlay::toolkit::WindowId;
use glass_overlay::settings::OverlaySettings;
use glass_overlay::shell::surface::PARKED_POSITION;
use glass_overlay::shell::EguiSurface;
use std::time::Instant;

#[path = "mock_ctx.rs"]
mod mock_ctx;
use mock_ctx::MockCtx;

use fake_shell::Fakes;

const ID: WindowId = WindowId(1);

fn session_on(surface: &EguiSurface, fakes: &Fakes) -> OverlaySession {
    OverlaySession::new(
        OverlayServices {
            toolkit: Box::new(surface.clone()),
            displays: Box::new(fakes.displays.clone()),
            clipboard: Box::new(fakes.clipboard.clone()),
            dialogs: Box::new(fakes.dialogs.clone()),
            presenter: Box::new(surface.clone()),
        },
        OverlaySettings {
            capture_settle_delay_ms: 0,
            ..OverlaySettings::default()
        },
    )
}

#[test]
fn drag_flushes_rounded_position_and_fixed_size() {
    let fakes = Fakes::single_display(IntRect::default());
    let surface = EguiSurface::new(ID);
    surface.state_mut().os_outer = IntRect::new(100, 100, 800, 600);
    let mut session = session_on(&surface, &fakes);
    session.open_window(ID).unwrap();

    session
        .begin_gesture(ID, DragKind::Window, Point::new(150.0, 120.0))
        .unwrap();
    session
        .update_gesture(ID, Point::new(200.4, 150.6), Instant::now())
        .unwrap();

    let ctx = MockCtx::default();
    assert_eq!(surface.flush(&ctx), 2);
    let cmds = ctx.commands.lock().unwrap();
    match (&cmds[0], &cmds[1]) {
        (egui::ViewportCommand::OuterPosition(pos), egui::ViewportCommand::InnerSize(size)) => {
            assert_eq!(*pos, egui::pos2(150.0, 131.0));
            assert_eq!(*size, egui::vec2(800.0, 600.0));
        }
        other => panic!("unexpected commands {other:?}"),
    }
    assert_eq!(*ctx.repaints.lock().unwrap(), 1);

    // Nothing queued, nothing sent.
    assert_eq!(surface.flush(&ctx), 0);
}

#[test]
fn capture_parks_the_viewport_and_brings_it_back() {
    let fakes = Fakes::single_display(IntRect::default());
    fakes.displays.0.borrow_mut().sources = Some(Vec::new());
    let surface = EguiSurface::new(ID);
    surface.state_mut().os_outer = IntRect::new(40, 30, 300, 200);
    let mut session = session_on(&surface, &fakes);
    session.open_window(ID).unwrap();

    session.capture_blocking(ID);

    let ctx = MockCtx::default();
    surface.flush(&ctx);
    let cmds = ctx.commands.lock().unwrap();
    assert!(matches!(cmds[0], egui::ViewportCommand::OuterPosition(pos) if pos == PARKED_POSITION));
    assert!(matches!(
        cmds[1],
        egui::ViewportCommand::OuterPosition(pos) if pos == egui::pos2(40.0, 30.0)
    ));
    assert!(matches!(cmds[2], egui::ViewportCommand::Focus));
    assert!(surface.state().visible);
}

#[test]
fn pending_capture_never_makes_the_viewport_invisible() {
    let fakes = Fakes::single_display(IntRect::default());
    fakes.displays.0.borrow_mut().sources = Some(Vec::new());
    let surface = EguiSurface::new(ID);
    surface.state_mut().os_outer = IntRect::new(40, 30, 300, 200);
    let mut session = session_on(&surface, &fakes);
    session.open_window(ID).unwrap();
    let now = Instant::now();
    session.begin_capture(ID, now).unwrap();

    let ctx = MockCtx::default();
    assert_eq!(surface.flush(&ctx), 1);
    assert_eq!(*ctx.repaints.lock().unwrap(), 1);
    assert!(!surface.state().visible);

    // Frames keep coming while parked; the next one finishes the capture.
    surface.state_mut().os_outer = IntRect::new(-32000, -32000, 300, 200);
    assert_eq!(session.tick(now).len(), 1);
    surface.flush(&ctx);

    let cmds = ctx.commands.lock().unwrap();
    assert!(!cmds
        .iter()
        .any(|cmd| matches!(cmd, egui::ViewportCommand::Visible(false))));
    assert!(matches!(
        cmds.last(),
        Some(egui::ViewportCommand::Focus)
    ));
    assert!(matches!(
        cmds[cmds.len() - 2],
        egui::ViewportCommand::OuterPosition(pos) if pos == egui::pos2(40.0, 30.0)
    ));
    assert!(surface.state().visible);
}

#[test]
fn presenter_state_tracks_session() {
    let fakes = Fakes::single_display(IntRect::default());
    let surface = EguiSurface::new(ID);
    surface.state_mut().os_outer = IntRect::new(0, 0, 300, 200);
    let mut session = session_on(&surface, &fakes);
    session.open_window(ID).unwrap();

    assert_eq!(surface.state().opacity, 0.1);
    assert_eq!(surface.state().border_width, 2.0);

    *fakes.clipboard.0.borrow_mut() = Some(glass_overlay::overlay::RgbaBuffer::new(
        10,
        10,
        glass_overlay::overlay::Rgba::rgba(1, 2, 3, 255),
    ));
    session.paste_from_clipboard(ID, Instant::now()).unwrap();

    let state = surface.state();
    assert!(state.background.is_some());
    let layer = state.layer.expect("layer placed");
    assert_eq!(layer.size, Size::new(10.0, 10.0));
    assert_eq!(layer.position, Point::ZERO);
}
