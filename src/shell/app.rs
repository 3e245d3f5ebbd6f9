use crate::overlay::capture::CaptureOutcome;
use crate::overlay::error::OverlayResult;
use crate::overlay::geometry::{IntRect, Point, Size};
use crate::overlay::messages::WindowEvent;
use crate::overlay::session::{OverlayServices, OverlaySession, PasteOutcome};
use crate::overlay::state::{DragKind, EditKind, InteractionMode};
use crate::overlay::toolkit::WindowId;
use crate::platform::{NativeDialogs, ScreenDisplays, SystemClipboard};
use crate::settings::OverlaySettings;
use crate::shell::surface::EguiSurface;
use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

pub const MAIN_WINDOW: WindowId = WindowId(1);
const STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Copy,
    Paste,
    Open,
    Save,
    Capture,
    Reset,
    Crop,
    ToggleBorder,
    ColorKey,
    Cancel,
    Close,
}

impl ShellAction {
    pub const MENU: [ShellAction; 10] = [
        ShellAction::Capture,
        ShellAction::Paste,
        ShellAction::Copy,
        ShellAction::Open,
        ShellAction::Save,
        ShellAction::Reset,
        ShellAction::Crop,
        ShellAction::ColorKey,
        ShellAction::ToggleBorder,
        ShellAction::Close,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShellAction::Copy => "Copy image (Ctrl+C)",
            ShellAction::Paste => "Paste image (P)",
            ShellAction::Open => "Open image... (O)",
            ShellAction::Save => "Save image... (S)",
            ShellAction::Capture => "Capture behind (Space)",
            ShellAction::Reset => "Reset view (R)",
            ShellAction::Crop => "Crop to view (X)",
            ShellAction::ToggleBorder => "Toggle border (B)",
            ShellAction::ColorKey => "Color key (K)",
            ShellAction::Cancel => "Cancel",
            ShellAction::Close => "Close (Esc)",
        }
    }
}

/// Plain-key shortcuts. Copy arrives as `Event::Copy` and is not mapped here.
pub fn action_for_key(key: egui::Key, modifiers: egui::Modifiers, editing: bool) -> Option<ShellAction> {
    if modifiers.command || modifiers.alt {
        return None;
    }
    match key {
        egui::Key::P => Some(ShellAction::Paste),
        egui::Key::O => Some(ShellAction::Open),
        egui::Key::S => Some(ShellAction::Save),
        egui::Key::Space => Some(ShellAction::Capture),
        egui::Key::R => Some(ShellAction::Reset),
        egui::Key::X => Some(ShellAction::Crop),
        egui::Key::B => Some(ShellAction::ToggleBorder),
        egui::Key::K => Some(ShellAction::ColorKey),
        egui::Key::Escape if editing => Some(ShellAction::Cancel),
        egui::Key::Escape => Some(ShellAction::Close),
        _ => None,
    }
}

pub fn drag_kind_for(modifiers: egui::Modifiers) -> DragKind {
    if modifiers.command {
        DragKind::Combined
    } else if modifiers.shift {
        DragKind::Image
    } else {
        DragKind::Window
    }
}

/// Everything the frame needs from `egui::InputState`, read in one lock.
#[derive(Debug, Default)]
struct FrameInput {
    outer: Option<egui::Rect>,
    inner: Option<egui::Rect>,
    close_requested: bool,
    hover: Option<egui::Pos2>,
    interact: Option<egui::Pos2>,
    pressed: bool,
    released: bool,
    double_clicked: bool,
    scroll: f32,
    zoom: f32,
    modifiers: egui::Modifiers,
    actions: Vec<ShellAction>,
}

pub struct OverlayApp {
    session: OverlaySession,
    surface: EguiSurface,
    events_tx: Sender<WindowEvent>,
    events_rx: Receiver<WindowEvent>,
    opened: bool,
    closing: bool,
    last_outer: Option<IntRect>,
    texture: Option<(u64, egui::TextureHandle)>,
    tolerance_input: String,
    status: Option<(String, Instant)>,
}

impl OverlayApp {
    pub fn new(settings: OverlaySettings) -> Self {
        let surface = EguiSurface::new(MAIN_WINDOW);
        let services = OverlayServices {
            toolkit: Box::new(surface.clone()),
            displays: Box::new(ScreenDisplays::new()),
            clipboard: Box::new(SystemClipboard::new()),
            dialogs: Box::new(NativeDialogs::new(settings.export_dir())),
            presenter: Box::new(surface.clone()),
        };
        Self::from_parts(surface, OverlaySession::new(services, settings))
    }

    pub fn from_parts(surface: EguiSurface, session: OverlaySession) -> Self {
        let (events_tx, events_rx) = channel();
        let tolerance_input = format!("{}", session.settings().color_key_tolerance);
        Self {
            session,
            surface,
            events_tx,
            events_rx,
            opened: false,
            closing: false,
            last_outer: None,
            texture: None,
            tolerance_input,
            status: None,
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some((text.into(), Instant::now()));
    }

    fn report<T>(&mut self, what: &str, result: OverlayResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%err, "{what} failed");
                self.set_status(format!("{what} failed: {err}"));
                None
            }
        }
    }

    fn read_input(&self, ctx: &egui::Context) -> FrameInput {
        let editing = self.editing();
        ctx.input(|i| {
            let mut input = FrameInput {
                outer: i.viewport().outer_rect,
                inner: i.viewport().inner_rect,
                close_requested: i.viewport().close_requested(),
                hover: i.pointer.hover_pos(),
                interact: i.pointer.interact_pos(),
                pressed: i.pointer.primary_pressed(),
                released: i.pointer.primary_released(),
                double_clicked: i.pointer.button_double_clicked(egui::PointerButton::Primary),
                scroll: i.raw_scroll_delta.y,
                zoom: i.zoom_delta(),
                modifiers: i.modifiers,
                actions: Vec::new(),
            };
            for event in &i.events {
                match event {
                    egui::Event::Copy => input.actions.push(ShellAction::Copy),
                    egui::Event::Paste(_) => input.actions.push(ShellAction::Paste),
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        modifiers,
                        ..
                    } => {
                        if let Some(action) = action_for_key(*key, *modifiers, editing) {
                            input.actions.push(action);
                        }
                    }
                    _ => {}
                }
            }
            input
        })
    }

    fn editing(&self) -> bool {
        matches!(
            self.session.mode(MAIN_WINDOW),
            Ok(InteractionMode::Editing(EditKind::ColorKey))
        )
    }

    /// Feeds viewport geometry into the native event channel, then drains it.
    fn sync_viewport(&mut self, ctx: &egui::Context, input: &FrameInput, now: Instant) {
        let outer = input
            .outer
            .or(input.inner)
            .map(|r| Point::new(r.min.x as f64, r.min.y as f64))
            .unwrap_or(Point::ZERO);
        let size = input
            .inner
            .or(input.outer)
            .map(|r| Size::new(r.width() as f64, r.height() as f64))
            .unwrap_or_else(|| self.session.settings().window_config().size);
        let os_outer = IntRect::new(
            outer.x.round() as i32,
            outer.y.round() as i32,
            size.width.round() as i32,
            size.height.round() as i32,
        );
        {
            let mut state = self.surface.state_mut();
            state.os_outer = os_outer;
            state.pixels_per_point = ctx.pixels_per_point();
        }

        if !self.opened {
            let result = self.session.open_window(MAIN_WINDOW);
            if let Some(bounds) = self.report("open window", result) {
                tracing::debug!(?bounds, "overlay ready");
                self.opened = true;
                self.last_outer = Some(os_outer);
            }
            return;
        }

        if let Some(last) = self.last_outer {
            if (last.width, last.height) != (os_outer.width, os_outer.height) {
                let _ = self.events_tx.send(WindowEvent::Resized {
                    id: MAIN_WINDOW,
                    size,
                });
            }
            if (last.x, last.y) != (os_outer.x, os_outer.y) {
                let _ = self.events_tx.send(WindowEvent::Moved {
                    id: MAIN_WINDOW,
                    position: outer,
                });
            }
        }
        self.last_outer = Some(os_outer);
        if input.close_requested {
            let _ = self.events_tx.send(WindowEvent::Closed { id: MAIN_WINDOW });
        }

        self.session.pump_events(&self.events_rx, now);
        if !self.session.coordinator().registry().contains(MAIN_WINDOW) {
            self.closing = true;
        }
    }

    fn screen_point(&self, local: egui::Pos2) -> Point {
        let outer = self.surface.state().os_outer;
        Point::new(outer.x as f64 + local.x as f64, outer.y as f64 + local.y as f64)
    }

    fn content_point(&self, local: egui::Pos2) -> Point {
        let border = self
            .session
            .window(MAIN_WINDOW)
            .map(|w| w.border_width)
            .unwrap_or(0.0);
        Point::new(local.x as f64 - border, local.y as f64 - border)
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, input: &FrameInput, now: Instant) {
        let over_ui = ctx.is_pointer_over_area();

        if input.double_clicked && !over_ui && !self.editing() {
            self.session.end_gesture(MAIN_WINDOW);
            let result = self.session.reset(MAIN_WINDOW, now);
            self.report("reset", result);
            return;
        }

        if input.pressed && !over_ui {
            if let Some(pos) = input.interact {
                if self.editing() {
                    let click = Point::new(pos.x as f64, pos.y as f64);
                    let tolerance = self.tolerance_input.clone();
                    let result = self.session.apply_color_key(MAIN_WINDOW, click, &tolerance);
                    match self.report("color key", result) {
                        Some(Some(report)) => self.set_status(format!(
                            "keyed {} pixels at tolerance {}",
                            report.keyed_pixels, report.tolerance
                        )),
                        Some(None) => self.set_status("click inside the border to pick a color"),
                        None => {}
                    }
                } else {
                    let kind = drag_kind_for(input.modifiers);
                    let pointer = self.screen_point(pos);
                    let result = self.session.begin_gesture(MAIN_WINDOW, kind, pointer);
                    self.report("drag", result);
                }
            }
        }

        if let Some(pos) = input.interact {
            if !input.pressed && !input.released {
                let pointer = self.screen_point(pos);
                let result = self.session.update_gesture(MAIN_WINDOW, pointer, now);
                self.report("drag", result);
            }
        }
        if input.released {
            self.session.end_gesture(MAIN_WINDOW);
        }

        if over_ui {
            return;
        }
        let Some(hover) = input.hover else {
            return;
        };
        if input.zoom != 1.0 {
            let pointer = self.content_point(hover);
            let result = self
                .session
                .zoom_image(MAIN_WINDOW, pointer, input.zoom as f64);
            self.report("zoom", result);
        } else if input.scroll != 0.0 {
            let steps = if input.scroll > 0.0 { 1 } else { -1 };
            if input.modifiers.alt {
                let pointer = self.screen_point(hover);
                let result = self
                    .session
                    .zoom_window_steps(MAIN_WINDOW, pointer, steps, now);
                self.report("window zoom", result);
            } else if input.modifiers.shift {
                let pointer = self.content_point(hover);
                let result = self.session.zoom_image_steps(MAIN_WINDOW, pointer, steps);
                self.report("zoom", result);
            } else {
                let result = self.session.adjust_opacity(MAIN_WINDOW, steps);
                self.report("opacity", result);
            }
        }
    }

    fn run_action(&mut self, action: ShellAction, now: Instant) {
        let id = MAIN_WINDOW;
        match action {
            ShellAction::Copy => {
                let result = self.session.copy_to_clipboard(id);
                if self.report("copy", result).is_some() {
                    self.set_status("image copied");
                }
            }
            ShellAction::Paste => match self.session.paste_from_clipboard(id, now) {
                Ok(PasteOutcome::Pasted) => self.set_status("image pasted"),
                Ok(PasteOutcome::Empty) => self.set_status("clipboard has no image"),
                Err(err) => {
                    self.report::<()>("paste", Err(err));
                }
            },
            ShellAction::Open => {
                let result = self.session.open_image(id, now);
                if let Some(Some(path)) = self.report("open", result) {
                    self.set_status(format!("opened {}", path.display()));
                }
            }
            ShellAction::Save => {
                let result = self.session.save_image(id);
                if let Some(Some(path)) = self.report("save", result) {
                    self.set_status(format!("saved {}", path.display()));
                }
            }
            ShellAction::Capture => {
                let result = self.session.begin_capture(id, now);
                self.report("capture", result);
            }
            ShellAction::Reset => {
                let result = self.session.reset(id, now);
                self.report("reset", result);
            }
            ShellAction::Crop => {
                let result = self.session.crop_to_view(id, now);
                if let Some(None) = self.report("crop", result) {
                    self.set_status("nothing visible to crop to");
                }
            }
            ShellAction::ToggleBorder => {
                let result = self.session.toggle_border(id);
                self.report("border", result);
            }
            ShellAction::ColorKey => {
                let result = self.session.arm_color_key(id);
                if self.report("color key", result).is_some() {
                    self.set_status("click a color to make it transparent");
                }
            }
            ShellAction::Cancel => {
                let result = self.session.cancel_color_key(id);
                self.report("cancel", result);
            }
            ShellAction::Close => {
                self.session.close_window(id);
                self.closing = true;
            }
        }
    }

    fn absorb_captures(&mut self, outcomes: Vec<(WindowId, CaptureOutcome)>) {
        for (_, outcome) in outcomes {
            match outcome {
                CaptureOutcome::Captured(capture) => self.set_status(format!(
                    "captured {}x{} at {:.2}x",
                    capture.crop.width, capture.crop.height, capture.effective_scale
                )),
                CaptureOutcome::Failed(err) => self.set_status(format!("capture failed: {err}")),
                CaptureOutcome::WindowGone => {}
            }
        }
    }

    fn sync_texture(&mut self, ctx: &egui::Context) {
        let state = self.surface.state();
        let generation = state.background_generation;
        if self.texture.as_ref().map(|(g, _)| *g) == Some(generation) {
            return;
        }
        let texture = state.background.as_ref().map(|image| {
            ctx.load_texture(
                "overlay-image",
                egui::ColorImage::from_rgba_unmultiplied(
                    [image.width as usize, image.height as usize],
                    &image.pixels,
                ),
                egui::TextureOptions::NEAREST,
            )
        });
        drop(state);
        self.texture = texture.map(|t| (generation, t));
    }

    fn paint(&self, ui: &mut egui::Ui) {
        let rect = ui.max_rect();
        let painter = ui.painter();
        let state = self.surface.state();
        if !state.visible {
            return;
        }

        let alpha = (state.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        painter.rect_filled(
            rect,
            0.0,
            egui::Color32::from_rgba_unmultiplied(255, 255, 255, alpha),
        );

        let border = state.border_width as f32;
        let content = rect.shrink(border);
        if let (Some((_, texture)), Some(layer)) = (&self.texture, state.layer) {
            let image_rect = egui::Rect::from_min_size(
                content.min + egui::vec2(layer.position.x as f32, layer.position.y as f32),
                egui::vec2(layer.size.width as f32, layer.size.height as f32),
            );
            painter.with_clip_rect(content).image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        if border > 0.0 {
            let c = state.border_color;
            painter.rect_stroke(
                rect.shrink(border / 2.0),
                0.0,
                egui::Stroke::new(border, egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)),
            );
        }

        if let Some((text, at)) = &self.status {
            if at.elapsed() < STATUS_TTL {
                painter.text(
                    content.left_bottom() + egui::vec2(6.0, -6.0),
                    egui::Align2::LEFT_BOTTOM,
                    text,
                    egui::FontId::proportional(13.0),
                    egui::Color32::from_rgb(220, 40, 40),
                );
            }
        }
    }

    fn context_menu(&mut self, response: egui::Response, now: Instant) {
        let mut chosen = None;
        response.context_menu(|ui| {
            for action in ShellAction::MENU {
                if ui.button(action.label()).clicked() {
                    chosen = Some(action);
                    ui.close_menu();
                }
            }
        });
        if let Some(action) = chosen {
            self.run_action(action, now);
        }
    }

    fn tolerance_prompt(&mut self, ctx: &egui::Context) {
        if !self.editing() {
            return;
        }
        egui::Area::new(egui::Id::new("color-key-tolerance"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-8.0, 8.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Tolerance (0-100)");
                        ui.add(egui::TextEdit::singleline(&mut self.tolerance_input).desired_width(48.0));
                    });
                });
            });
    }
}

impl eframe::App for OverlayApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let input = self.read_input(ctx);
        self.sync_viewport(ctx, &input, now);

        if self.opened && !self.closing {
            let outcomes = self.session.tick(now);
            self.absorb_captures(outcomes);

            let capturing = self.session.has_pending_capture(MAIN_WINDOW);
            if !capturing {
                let typing = ctx.wants_keyboard_input();
                for action in &input.actions {
                    if typing && !matches!(action, ShellAction::Cancel | ShellAction::Close) {
                        continue;
                    }
                    self.run_action(*action, now);
                }
                self.handle_pointer(ctx, &input, now);
            }
        }

        self.sync_texture(ctx);
        self.tolerance_prompt(ctx);
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.paint(ui);
                let response = ui.interact(
                    ui.max_rect(),
                    egui::Id::new("overlay-surface"),
                    egui::Sense::click(),
                );
                self.context_menu(response, now);
            });

        self.surface.flush(ctx);
        if self.closing {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        if self.session.has_pending_capture(MAIN_WINDOW) {
            ctx.request_repaint_after(self.session.settings().capture_settle_delay() / 4);
        } else if self.status.is_some() {
            ctx.request_repaint_after(STATUS_TTL);
        }
    }
}
