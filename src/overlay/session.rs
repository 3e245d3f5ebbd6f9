//! Gesture-level operations. Each public method is one transaction: it
//! reads authoritative state, computes the new geometry once, and writes the
//! result to the toolkit and presenter without reading anything back.
//! The bounds write goes first; image state only changes once it succeeded.

use crate::overlay::capture::{CaptureOutcome, CaptureTicket, ScreenCapture};
use crate::overlay::colorkey::{apply_color_key, parse_tolerance, sample_point};
use crate::overlay::coordinator::{Coordinator, DragHandle};
use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::export::{read_image, suggested_file_name, write_png};
use crate::overlay::geometry::{BoundsPatch, Point, Rect};
use crate::overlay::messages::{EventOutcome, WindowEvent};
use crate::overlay::raster::RgbaBuffer;
use crate::overlay::registry::WindowState;
use crate::overlay::state::{DragKind, EditKind, InteractionMode};
use crate::overlay::toolkit::{
    ClipboardService, DisplayService, FileDialogs, Presenter, WindowId, WindowToolkit,
};
use crate::overlay::transform::{self, CropRequest, ImageState};
use crate::settings::OverlaySettings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Instant;

pub struct OverlayServices {
    pub toolkit: Box<dyn WindowToolkit>,
    pub displays: Box<dyn DisplayService>,
    pub clipboard: Box<dyn ClipboardService>,
    pub dialogs: Box<dyn FileDialogs>,
    pub presenter: Box<dyn Presenter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    Pasted,
    /// Nothing image-like on the clipboard. Not an error.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorKeyReport {
    pub keyed_pixels: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy)]
struct ActiveGesture {
    handle: DragHandle,
    pointer_start: Point,
    image_start: Option<Point>,
}

pub struct OverlaySession {
    coordinator: Coordinator,
    clipboard: Box<dyn ClipboardService>,
    dialogs: Box<dyn FileDialogs>,
    presenter: Box<dyn Presenter>,
    settings: OverlaySettings,
    gestures: HashMap<WindowId, ActiveGesture>,
    captures: Vec<CaptureTicket>,
}

impl OverlaySession {
    pub fn new(services: OverlayServices, settings: OverlaySettings) -> Self {
        let coordinator = Coordinator::new(services.toolkit, services.displays)
            .with_grace(settings.programmatic_move_grace());
        Self {
            coordinator,
            clipboard: services.clipboard,
            dialogs: services.dialogs,
            presenter: services.presenter,
            settings,
            gestures: HashMap::new(),
            captures: Vec::new(),
        }
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn window(&self, id: WindowId) -> OverlayResult<&WindowState> {
        self.coordinator.registry().window(id)
    }

    pub fn bounds(&self, id: WindowId) -> OverlayResult<Rect> {
        self.coordinator.bounds(id)
    }

    pub fn image(&self, id: WindowId) -> OverlayResult<Option<&ImageState>> {
        self.coordinator
            .registry()
            .get(id)
            .map(|entry| entry.image.as_ref())
    }

    pub fn mode(&self, id: WindowId) -> OverlayResult<InteractionMode> {
        self.coordinator.mode(id)
    }

    pub fn open_window(&mut self, id: WindowId) -> OverlayResult<Rect> {
        let border = self.settings.effective_border_width();
        let opacity = self.settings.initial_opacity;
        let bounds = self.coordinator.register_window(id, border, opacity)?;
        self.presenter.set_background(id, None);
        self.presenter.set_opacity(id, opacity);
        self.presenter
            .set_border(id, border, self.settings.border_color.to_rgba());
        tracing::info!(%id, ?bounds, "overlay window opened");
        Ok(bounds)
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.gestures.remove(&id);
        self.captures.retain(|ticket| ticket.window_id != id);
        if self.coordinator.remove_window(id) {
            tracing::info!(%id, "overlay window closed");
        }
    }

    pub fn handle_event(&mut self, event: WindowEvent, now: Instant) -> OverlayResult<EventOutcome> {
        let id = event.window_id();
        let outcome = self.coordinator.handle_event(event, now)?;
        if outcome == EventOutcome::Closed {
            self.close_window(id);
        }
        Ok(outcome)
    }

    pub fn pump_events(&mut self, rx: &Receiver<WindowEvent>, now: Instant) {
        for (id, outcome) in self.coordinator.pump_events(rx, now) {
            if outcome == EventOutcome::Closed {
                self.close_window(id);
            }
        }
    }

    /// Per-frame housekeeping: expire programmatic-move flags and finish any
    /// capture whose settle delay has passed.
    pub fn tick(&mut self, now: Instant) -> Vec<(WindowId, CaptureOutcome)> {
        self.coordinator.tick(now);
        self.poll_captures(now)
    }

    // Drags ---------------------------------------------------------------

    pub fn begin_gesture(
        &mut self,
        id: WindowId,
        kind: DragKind,
        pointer_screen: Point,
    ) -> OverlayResult<()> {
        let handle = self.coordinator.begin_drag(id, pointer_screen, kind)?;
        let image_start = self.image(id)?.map(|image| image.offset);
        self.gestures.insert(
            id,
            ActiveGesture {
                handle,
                pointer_start: pointer_screen,
                image_start,
            },
        );
        Ok(())
    }

    pub fn update_gesture(
        &mut self,
        id: WindowId,
        pointer_screen: Point,
        now: Instant,
    ) -> OverlayResult<()> {
        let Some(gesture) = self.gestures.get(&id).copied() else {
            return Ok(());
        };
        let result = self.drive_gesture(&gesture, pointer_screen, now);
        if result.is_err() {
            self.end_gesture(id);
        }
        result
    }

    fn drive_gesture(
        &mut self,
        gesture: &ActiveGesture,
        pointer_screen: Point,
        now: Instant,
    ) -> OverlayResult<()> {
        let id = gesture.handle.window_id;
        match gesture.handle.kind {
            DragKind::Window => {
                self.coordinator
                    .apply_drag(&gesture.handle, pointer_screen, now)?;
            }
            DragKind::Image => {
                if let Some(start) = gesture.image_start {
                    let delta = pointer_screen - gesture.pointer_start;
                    if let Some(image) = self.image_mut(id)? {
                        transform::pan(image, start, delta);
                    }
                    self.present_layer(id)?;
                }
            }
            DragKind::Combined => {
                let bounds = self
                    .coordinator
                    .apply_drag(&gesture.handle, pointer_screen, now)?;
                if let Some(start) = gesture.image_start {
                    let moved = bounds.origin() - gesture.handle.start_bounds.origin();
                    if let Some(image) = self.image_mut(id)? {
                        transform::pan(image, start, Point::ZERO - moved);
                    }
                    self.present_layer(id)?;
                }
            }
        }
        Ok(())
    }

    /// Always clears drag state, even for a window that has gone away.
    pub fn end_gesture(&mut self, id: WindowId) {
        self.gestures.remove(&id);
        if let Err(err) = self.coordinator.end_drag(id) {
            tracing::debug!(%id, %err, "end of drag for missing window");
        }
    }

    // Zoom ----------------------------------------------------------------

    /// Zooms the image about `pointer` (content coordinates) by
    /// `zoom_step ^ steps`.
    pub fn zoom_image_steps(&mut self, id: WindowId, pointer: Point, steps: i32) -> OverlayResult<f64> {
        let factor = self.settings.zoom_step.powi(steps);
        self.zoom_image(id, pointer, factor)
    }

    pub fn zoom_image(&mut self, id: WindowId, pointer: Point, factor: f64) -> OverlayResult<f64> {
        self.ensure_not_capturing(id)?;
        let limits = self.settings.scale_limits();
        let Some(image) = self.image_mut(id)? else {
            return Ok(1.0);
        };
        let requested = image.scale * factor;
        let ratio = transform::zoom_about_point(image, pointer, requested, limits);
        if ratio != 1.0 {
            self.present_layer(id)?;
        }
        Ok(ratio)
    }

    /// Scales window and image together about the pointer's screen position.
    pub fn zoom_window_steps(
        &mut self,
        id: WindowId,
        pointer_screen: Point,
        steps: i32,
        now: Instant,
    ) -> OverlayResult<Rect> {
        let factor = self.settings.zoom_step.powi(steps);
        self.zoom_window(id, pointer_screen, factor, now)
    }

    pub fn zoom_window(
        &mut self,
        id: WindowId,
        pointer_screen: Point,
        factor: f64,
        now: Instant,
    ) -> OverlayResult<Rect> {
        self.ensure_not_capturing(id)?;
        let limits = self.settings.scale_limits();
        let current = self.bounds(id)?;
        let zoom = transform::zoom_window(
            current,
            self.image(id)?,
            pointer_screen,
            factor,
            limits,
            self.settings.min_window_size,
        );
        if zoom.ratio == 1.0 {
            return Ok(current);
        }
        let bounds = self
            .coordinator
            .set_bounds(id, BoundsPatch::full(zoom.bounds), now)?;
        if let (Some(view), Some(image)) = (zoom.image, self.image_mut(id)?) {
            view.apply_to(image);
        }
        self.present_layer(id)?;
        Ok(bounds)
    }

    // Chrome --------------------------------------------------------------

    /// Steps background opacity; positive `steps` make it more opaque.
    pub fn adjust_opacity(&mut self, id: WindowId, steps: i32) -> OverlayResult<f32> {
        let (step, min, max) = (
            self.settings.opacity_step,
            self.settings.min_opacity,
            self.settings.max_opacity,
        );
        let window = self.coordinator.registry_mut().window_mut(id)?;
        window.opacity = (window.opacity + step * steps as f32).clamp(min, max);
        let opacity = window.opacity;
        self.presenter.set_opacity(id, opacity);
        tracing::debug!(%id, opacity, "opacity adjusted");
        Ok(opacity)
    }

    pub fn toggle_border(&mut self, id: WindowId) -> OverlayResult<f64> {
        let configured = self.settings.border_width;
        let window = self.coordinator.registry_mut().window_mut(id)?;
        window.border_width = if window.border_width > 0.0 {
            0.0
        } else {
            configured
        };
        let width = window.border_width;
        self.presenter
            .set_border(id, width, self.settings.border_color.to_rgba());
        tracing::debug!(%id, width, "border toggled");
        Ok(width)
    }

    // Reset and crop ------------------------------------------------------

    /// Returns window and image to the state captured at the last capture,
    /// load or paste. Values are restored verbatim, not recomputed.
    pub fn reset(&mut self, id: WindowId, now: Instant) -> OverlayResult<Rect> {
        self.ensure_not_capturing(id)?;
        let original = self.window(id)?.original_bounds;
        let bounds = self
            .coordinator
            .set_bounds(id, BoundsPatch::full(original), now)?;
        if let Some(image) = self.image_mut(id)? {
            transform::reset(image);
        }
        self.present_layer(id)?;
        Ok(bounds)
    }

    /// Shrinks the window to the visible part of the image. `Ok(None)` when
    /// nothing is visible; a second call without intervening changes writes
    /// nothing.
    pub fn crop_to_view(&mut self, id: WindowId, now: Instant) -> OverlayResult<Option<CropRequest>> {
        self.ensure_not_capturing(id)?;
        let window = self.window(id)?;
        let (bounds, border) = (window.bounds, window.border_width);
        let Some(image) = self.image(id)? else {
            return Ok(None);
        };
        let Some(plan) = transform::plan_crop(bounds, border, image) else {
            tracing::debug!(%id, "crop skipped: image not visible");
            return Ok(None);
        };
        if plan.bounds == bounds && plan.image_offset == image.offset {
            return Ok(Some(plan.request));
        }

        self.coordinator
            .set_bounds(id, BoundsPatch::full(plan.bounds), now)?;
        if let Some(image) = self.image_mut(id)? {
            image.offset = plan.image_offset;
        }
        self.present_layer(id)?;
        tracing::debug!(%id, ?plan, "cropped to view");
        Ok(Some(plan.request))
    }

    // Capture -------------------------------------------------------------

    pub fn begin_capture(&mut self, id: WindowId, now: Instant) -> OverlayResult<CaptureTicket> {
        if self.gestures.contains_key(&id) {
            return Err(OverlayError::Busy {
                window: id,
                reason: "drag in progress",
            });
        }
        let ticket = self
            .coordinator
            .begin_capture(id, now, self.settings.capture_settle_delay())?;
        self.captures.push(ticket);
        Ok(ticket)
    }

    pub fn poll_captures(&mut self, now: Instant) -> Vec<(WindowId, CaptureOutcome)> {
        let (ready, pending): (Vec<_>, Vec<_>) = self
            .captures
            .drain(..)
            .partition(|ticket| now >= ticket.ready_at);
        self.captures = pending;

        ready
            .into_iter()
            .map(|ticket| {
                let outcome = self.coordinator.finish_capture(ticket);
                (ticket.window_id, self.absorb_capture(ticket.window_id, outcome))
            })
            .collect()
    }

    pub fn capture_blocking(&mut self, id: WindowId) -> CaptureOutcome {
        let outcome = self
            .coordinator
            .capture_blocking(id, self.settings.capture_settle_delay());
        self.absorb_capture(id, outcome)
    }

    pub fn has_pending_capture(&self, id: WindowId) -> bool {
        self.captures.iter().any(|ticket| ticket.window_id == id)
    }

    fn absorb_capture(&mut self, id: WindowId, outcome: CaptureOutcome) -> CaptureOutcome {
        match outcome {
            CaptureOutcome::Captured(capture) => match self.install_capture(id, &capture) {
                Ok(()) => CaptureOutcome::Captured(capture),
                Err(err) => CaptureOutcome::Failed(err),
            },
            other => other,
        }
    }

    /// The captured region is laid over the whole window (border included)
    /// so it lines up with the desktop it was taken from. Edges that hung
    /// off the display shift the region inward by the clipped amount.
    fn install_capture(&mut self, id: WindowId, capture: &ScreenCapture) -> OverlayResult<()> {
        let window = self.coordinator.registry_mut().window_mut(id)?;
        window.original_bounds = capture.window_bounds;
        let border = window.border_width;
        let image = ImageState::from_raster(
            capture.window_region(),
            capture.effective_scale,
            Point::new(capture.clipped.x - border, capture.clipped.y - border),
        );
        self.install_image(id, image)
    }

    // Color key -----------------------------------------------------------

    pub fn arm_color_key(&mut self, id: WindowId) -> OverlayResult<()> {
        self.coordinator
            .set_mode(id, InteractionMode::Editing(EditKind::ColorKey))
    }

    pub fn cancel_color_key(&mut self, id: WindowId) -> OverlayResult<()> {
        if self.mode(id)? == InteractionMode::Editing(EditKind::ColorKey) {
            self.coordinator.set_mode(id, InteractionMode::Idle)?;
        }
        Ok(())
    }

    /// Makes everything close to the colour under `click` transparent.
    ///
    /// The tolerance is validated before anything is captured or changed.
    /// `Ok(None)` when the click hit the border.
    pub fn apply_color_key(
        &mut self,
        id: WindowId,
        click: Point,
        tolerance_input: &str,
    ) -> OverlayResult<Option<ColorKeyReport>> {
        let tolerance = parse_tolerance(tolerance_input)?;
        let mode = self.mode(id)?;
        if !matches!(mode, InteractionMode::Idle | InteractionMode::Editing(_)) {
            return Err(OverlayError::Busy {
                window: id,
                reason: "drag or capture in progress",
            });
        }

        let window = self.window(id)?;
        let (border, content) = (window.border_width, window.content_rect());
        if content.is_empty() {
            return Ok(None);
        }
        let raster = self
            .coordinator
            .toolkit_mut()
            .capture_page(id, content)
            .map_err(OverlayError::toolkit)?;
        let pixel_scale = if raster.width > 0 {
            raster.width as f64 / content.width
        } else {
            1.0
        };
        let Some((sx, sy)) = sample_point(click, border, pixel_scale, &raster) else {
            tracing::debug!(%id, ?click, "color key click outside content");
            return Ok(None);
        };

        let reference = raster.pixel(sx, sy);
        let keyed = apply_color_key(&raster, reference, tolerance);
        tracing::info!(
            %id,
            ?reference,
            tolerance,
            keyed = keyed.keyed_pixels,
            "color key applied"
        );
        let image = ImageState::from_raster(keyed.image, pixel_scale, Point::ZERO);
        self.install_image(id, image)?;
        self.cancel_color_key(id)?;
        Ok(Some(ColorKeyReport {
            keyed_pixels: keyed.keyed_pixels,
            tolerance,
        }))
    }

    // Clipboard and files -------------------------------------------------

    pub fn copy_to_clipboard(&mut self, id: WindowId) -> OverlayResult<()> {
        let source = self.image(id)?.ok_or(OverlayError::NoImage(id))?.source.clone();
        self.clipboard
            .write_image(&source)
            .map_err(OverlayError::toolkit)?;
        tracing::info!(%id, width = source.width, height = source.height, "image copied");
        Ok(())
    }

    pub fn paste_from_clipboard(&mut self, id: WindowId, now: Instant) -> OverlayResult<PasteOutcome> {
        self.ensure_not_capturing(id)?;
        match self.clipboard.read_image().map_err(OverlayError::toolkit)? {
            Some(raster) if !raster.is_empty() => {
                self.load_raster(id, raster, now)?;
                Ok(PasteOutcome::Pasted)
            }
            _ => {
                tracing::info!(%id, "clipboard holds no image");
                Ok(PasteOutcome::Empty)
            }
        }
    }

    /// Asks for a file and loads it. `Ok(None)` when the dialog was cancelled.
    pub fn open_image(&mut self, id: WindowId, now: Instant) -> OverlayResult<Option<PathBuf>> {
        self.ensure_not_capturing(id)?;
        let Some(path) = self.dialogs.open_image_file() else {
            return Ok(None);
        };
        self.load_image_path(id, &path, now)?;
        Ok(Some(path))
    }

    pub fn load_image_path(&mut self, id: WindowId, path: &Path, now: Instant) -> OverlayResult<()> {
        let raster = read_image(path)?;
        tracing::info!(%id, path = %path.display(), "image loaded");
        self.load_raster(id, raster, now)
    }

    pub fn save_image(&mut self, id: WindowId) -> OverlayResult<Option<PathBuf>> {
        self.image(id)?.ok_or(OverlayError::NoImage(id))?;
        let suggested = suggested_file_name(chrono::Local::now());
        let Some(path) = self.dialogs.save_image_file(&suggested) else {
            return Ok(None);
        };
        self.save_image_to(id, &path)?;
        Ok(Some(path))
    }

    pub fn save_image_to(&mut self, id: WindowId, path: &Path) -> OverlayResult<()> {
        let image = self.image(id)?.ok_or(OverlayError::NoImage(id))?;
        write_png(path, &image.source)?;
        tracing::info!(%id, path = %path.display(), "image saved");
        Ok(())
    }

    /// Content-defining load: the raster is sized by the display's scale and
    /// the window is resized so its content area fits the image exactly.
    fn load_raster(&mut self, id: WindowId, raster: RgbaBuffer, now: Instant) -> OverlayResult<()> {
        let pixel_scale = self.coordinator.nearest_display(id)?.scale_factor;
        let border = self.window(id)?.border_width;
        let image = ImageState::from_raster(raster, pixel_scale, Point::ZERO);
        let size = image.logical_size;

        let bounds = self.coordinator.set_bounds(
            id,
            BoundsPatch::size(size.width + 2.0 * border, size.height + 2.0 * border),
            now,
        )?;
        self.coordinator.registry_mut().window_mut(id)?.original_bounds = bounds;
        self.install_image(id, image)
    }

    // Presentation --------------------------------------------------------

    fn install_image(&mut self, id: WindowId, image: ImageState) -> OverlayResult<()> {
        let entry = self.coordinator.registry_mut().get_mut(id)?;
        self.presenter.set_background(id, Some(&image.source));
        let placement = image.placement();
        self.presenter
            .set_layer(id, placement.size, placement.position);
        entry.image = Some(image);
        Ok(())
    }

    fn present_layer(&mut self, id: WindowId) -> OverlayResult<()> {
        if let Some(image) = self.image(id)? {
            let placement = image.placement();
            self.presenter
                .set_layer(id, placement.size, placement.position);
        }
        Ok(())
    }

    fn image_mut(&mut self, id: WindowId) -> OverlayResult<Option<&mut ImageState>> {
        self.coordinator
            .registry_mut()
            .get_mut(id)
            .map(|entry| entry.image.as_mut())
    }

    fn ensure_not_capturing(&self, id: WindowId) -> OverlayResult<()> {
        if self.mode(id)?.is_capturing() {
            return Err(OverlayError::Busy {
                window: id,
                reason: "capture in flight",
            });
        }
        Ok(())
    }
}
