use glass_overlay::overlay::capture::CaptureOutcome;
use glass_overlay::overlay::geometry::{IntRect, PixelRect, Point, Rect, Size};
use glass_overlay::overlay::raster::{Rgba, RgbaBuffer};
use glass_overlay::overlay::state::InteractionMode;
use glass_overlay::overlay::OverlayError;
use std::time::{Duration, Instant};

use fake_shell::{display, quick_settings, Fakes, WIN};

const GREEN: Rgba = Rgba::rgba(0, 255, 0, 255);

fn desktop(width: u32, height: u32) -> RgbaBuffer {
    RgbaBuffer::new(width, height, Rgba::rgba(40, 40, 40, 255))
}

#[test]
fn capture_trusts_raster_size_over_reported_scale() {
    // Display claims 2.0 but the capture API returns a 1:1 raster.
    let fakes = Fakes::new(
        IntRect::new(100, 50, 400, 300),
        vec![display(0, 0.0, 0.0, 1920.0, 1080.0, 2.0)],
    );
    let mut full = desktop(1920, 1080);
    full.set_pixel(100, 50, GREEN);
    fakes.displays.0.borrow_mut().sources = Some(vec![full]);

    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();
    let now = Instant::now();
    session.begin_capture(WIN, now).unwrap();
    assert_eq!(fakes.toolkit.0.borrow().hides, 1);
    assert!(session.mode(WIN).unwrap().is_capturing());

    let mut outcomes = session.poll_captures(now);
    assert_eq!(outcomes.len(), 1);
    let (id, outcome) = outcomes.remove(0);
    assert_eq!(id, WIN);
    let CaptureOutcome::Captured(capture) = outcome else {
        panic!("capture did not succeed");
    };

    assert_eq!(fakes.displays.0.borrow().size_hints, vec![(3840, 2160)]);
    assert_eq!(capture.effective_scale, 1.0);
    assert_eq!(
        capture.crop,
        PixelRect {
            x: 100,
            y: 50,
            width: 400,
            height: 300,
        }
    );
    assert_eq!(fakes.toolkit.0.borrow().shows, 1);
    assert_eq!(session.mode(WIN).unwrap(), InteractionMode::Idle);

    let image = session.image(WIN).unwrap().expect("image installed");
    assert_eq!(image.logical_size, Size::new(400.0, 300.0));
    assert_eq!(image.offset, Point::new(-2.0, -2.0));
    assert_eq!(image.source.pixel(0, 0), GREEN);
    assert_eq!(
        session.window(WIN).unwrap().original_bounds,
        Rect::new(100.0, 50.0, 400.0, 300.0)
    );
}

#[test]
fn capture_on_secondary_display_uses_its_own_source_and_scale() {
    let fakes = Fakes::new(
        IntRect::new(2000, 100, 200, 100),
        vec![
            display(0, 0.0, 0.0, 1920.0, 1080.0, 1.0),
            display(1, 1920.0, 0.0, 1600.0, 900.0, 1.5),
        ],
    );
    fakes.displays.0.borrow_mut().sources = Some(vec![desktop(1920, 1080), desktop(2400, 1350)]);

    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();
    let CaptureOutcome::Captured(capture) = session.capture_blocking(WIN) else {
        panic!("capture failed");
    };

    assert_eq!(capture.display.index, 1);
    assert_eq!(capture.effective_scale, 1.5);
    assert_eq!(
        capture.crop,
        PixelRect {
            x: 120,
            y: 150,
            width: 300,
            height: 150,
        }
    );
    let image = session.image(WIN).unwrap().expect("image installed");
    assert_eq!(image.logical_size, Size::new(200.0, 100.0));
}

#[test]
fn window_hanging_off_the_display_keeps_pixels_aligned() {
    let fakes = Fakes::single_display(IntRect::new(-20, 100, 200, 100));
    let mut full = desktop(1920, 1080);
    for y in 0..1080 {
        full.set_pixel(0, y, GREEN);
    }
    fakes.displays.0.borrow_mut().sources = Some(vec![full]);

    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();
    let CaptureOutcome::Captured(capture) = session.capture_blocking(WIN) else {
        panic!("capture failed");
    };

    assert_eq!(
        capture.crop,
        PixelRect {
            x: 0,
            y: 100,
            width: 180,
            height: 100,
        }
    );
    assert_eq!(capture.clipped, Point::new(20.0, 0.0));

    let image = session.image(WIN).unwrap().expect("image installed");
    assert_eq!(image.logical_size, Size::new(180.0, 100.0));
    assert_eq!(image.offset, Point::new(18.0, -2.0));
    assert_eq!(image.source.pixel(0, 50), GREEN);

    // Desktop x=0 sits at window x + border + offset.
    let bounds = session.bounds(WIN).unwrap();
    assert_eq!(bounds.x + 2.0 + image.offset.x, 0.0);

    session.reset(WIN, Instant::now()).unwrap();
    assert_eq!(
        session.image(WIN).unwrap().expect("image").offset,
        Point::new(18.0, -2.0)
    );
}

#[test]
fn failed_capture_still_reshows_window() {
    let fakes = Fakes::single_display(IntRect::new(0, 0, 300, 200));
    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();

    let outcome = session.capture_blocking(WIN);
    assert!(matches!(outcome, CaptureOutcome::Failed(OverlayError::Toolkit(_))));
    assert_eq!(fakes.toolkit.0.borrow().shows, 1);
    assert_eq!(session.mode(WIN).unwrap(), InteractionMode::Idle);
    assert!(session.image(WIN).unwrap().is_none());
}

#[test]
fn empty_source_list_reports_capture_unavailable() {
    let fakes = Fakes::single_display(IntRect::new(0, 0, 300, 200));
    fakes.displays.0.borrow_mut().sources = Some(Vec::new());
    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();

    let outcome = session.capture_blocking(WIN);
    assert!(matches!(outcome, CaptureOutcome::Failed(OverlayError::CaptureUnavailable)));
    assert_eq!(fakes.toolkit.0.borrow().shows, 1);
}

#[test]
fn hide_failure_restores_window() {
    let fakes = Fakes::single_display(IntRect::new(0, 0, 300, 200));
    fakes.toolkit.0.borrow_mut().fail_hide = true;
    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();

    assert!(session.begin_capture(WIN, Instant::now()).is_err());
    assert_eq!(fakes.toolkit.0.borrow().shows, 1);
    assert_eq!(session.mode(WIN).unwrap(), InteractionMode::Idle);
    assert!(!session.has_pending_capture(WIN));
}

#[test]
fn window_closed_during_capture_is_a_no_op() {
    let fakes = Fakes::single_display(IntRect::new(0, 0, 300, 200));
    fakes.displays.0.borrow_mut().sources = Some(vec![desktop(1920, 1080)]);
    let mut coord = fakes.coordinator();
    coord.register_window(WIN, 2.0, 0.1).unwrap();

    let ticket = coord
        .begin_capture(WIN, Instant::now(), Duration::ZERO)
        .unwrap();
    fakes.toolkit.0.borrow_mut().dead = true;

    assert!(matches!(coord.finish_capture(ticket), CaptureOutcome::WindowGone));
    assert_eq!(fakes.toolkit.0.borrow().shows, 0);
    assert!(fakes.displays.0.borrow().size_hints.is_empty());
}

#[test]
fn closing_the_window_drops_its_pending_capture() {
    let fakes = Fakes::single_display(IntRect::new(0, 0, 300, 200));
    let mut session = fakes.session(quick_settings());
    session.open_window(WIN).unwrap();
    let now = Instant::now();
    session.begin_capture(WIN, now).unwrap();

    session.close_window(WIN);
    assert!(session.poll_captures(now).is_empty());
}

#[test]
fn capture_waits_for_settle_delay_and_blocks_other_gestures() {
    let fakes = Fakes::single_display(IntRect::new(0, 0, 300, 200));
    fakes.displays.0.borrow_mut().sources = Some(vec![desktop(1920, 1080)]);
    let mut session = fakes.session(Default::default());
    session.open_window(WIN).unwrap();
    let now = Instant::now();
    session.begin_capture(WIN, now).unwrap();

    assert!(matches!(
        session.begin_capture(WIN, now),
        Err(OverlayError::Busy { .. })
    ));
    assert!(matches!(
        session.reset(WIN, now),
        Err(OverlayError::Busy { .. })
    ));
    assert!(session.poll_captures(now + Duration::from_millis(100)).is_empty());

    let done = session.poll_captures(now + Duration::from_millis(200));
    assert!(matches!(done.as_slice(), [(_, CaptureOutcome::Captured(_))]));
}
