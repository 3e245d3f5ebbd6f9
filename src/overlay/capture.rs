//! Screenshot of the desktop behind a window, with the reported DPI scale
//! reconciled against the raster the capture API actually returned.

use crate::overlay::coordinator::Coordinator;
use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::geometry::{PixelRect, Point, Rect};
use crate::overlay::raster::RgbaBuffer;
use crate::overlay::state::InteractionMode;
use crate::overlay::toolkit::{DisplayInfo, WindowId};
use std::time::{Duration, Instant};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Physical pixels per logical pixel as measured from the returned raster.
pub fn effective_scale(actual_width: u32, display_logical_width: f64) -> f64 {
    if display_logical_width <= 0.0 || actual_width == 0 {
        return 1.0;
    }
    actual_width as f64 / display_logical_width
}

/// Where a window's pixels sit inside a full-display raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowCrop {
    pub rect: PixelRect,
    /// Logical distance cut off the window's left and top edges because it
    /// hung past the display. The first captured pixel is this far into the
    /// window.
    pub clipped: Point,
}

/// Locates `window` inside a full-display raster, clamped to the raster.
pub fn crop_rect_for_window(
    window: Rect,
    display: Rect,
    effective_scale: f64,
    raster_width: u32,
    raster_height: u32,
) -> WindowCrop {
    let left = ((window.x - display.x) * effective_scale).floor();
    let top = ((window.y - display.y) * effective_scale).floor();
    let clip_x = (-left).max(0.0);
    let clip_y = (-top).max(0.0);

    let x = (left.max(0.0) as u32).min(raster_width);
    let y = (top.max(0.0) as u32).min(raster_height);
    let width = ((window.width * effective_scale).floor() - clip_x).max(0.0) as u32;
    let height = ((window.height * effective_scale).floor() - clip_y).max(0.0) as u32;

    let scale = if effective_scale > 0.0 { effective_scale } else { 1.0 };
    WindowCrop {
        rect: PixelRect {
            x,
            y,
            width: width.min(raster_width - x),
            height: height.min(raster_height - y),
        },
        clipped: Point::new(clip_x / scale, clip_y / scale),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket {
    pub window_id: WindowId,
    pub ready_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenCapture {
    pub window_bounds: Rect,
    pub display: DisplayInfo,
    pub requested: (u32, u32),
    pub effective_scale: f64,
    pub crop: PixelRect,
    /// Logical offset of the crop's first pixel from the window's outer
    /// top-left corner. Zero unless the window hung off the display.
    pub clipped: Point,
    pub full: RgbaBuffer,
}

impl ScreenCapture {
    /// The part of the screen the window was covering.
    pub fn window_region(&self) -> RgbaBuffer {
        self.full.crop(self.crop)
    }
}

#[derive(Debug)]
pub enum CaptureOutcome {
    Captured(ScreenCapture),
    /// The window was re-shown and the error logged.
    Failed(OverlayError),
    /// The window closed while the capture was pending; nothing was touched.
    WindowGone,
}

impl Coordinator {
    /// Hides the window and enters `Capturing`. The caller finishes the
    /// capture once `ready_at` has passed so the compositor has dropped the
    /// window from the back buffer.
    pub fn begin_capture(
        &mut self,
        id: WindowId,
        now: Instant,
        settle_delay: Duration,
    ) -> OverlayResult<CaptureTicket> {
        let ready_at = now + settle_delay;
        self.set_mode(id, InteractionMode::Capturing { ready_at })?;
        if let Err(err) = self.toolkit_mut().hide(id) {
            tracing::error!(%id, ?err, "hide before capture failed");
            self.restore_after_capture(id);
            return Err(OverlayError::toolkit(err));
        }
        tracing::debug!(%id, ?settle_delay, "window hidden for capture");
        Ok(CaptureTicket {
            window_id: id,
            ready_at,
        })
    }

    pub fn finish_capture(&mut self, ticket: CaptureTicket) -> CaptureOutcome {
        let id = ticket.window_id;
        if !self.registry().contains(id) || !self.toolkit_mut().is_alive(id) {
            tracing::debug!(%id, "window closed during capture");
            return CaptureOutcome::WindowGone;
        }

        let result = self.grab_window_region(id);
        self.restore_after_capture(id);
        match result {
            Ok(capture) => CaptureOutcome::Captured(capture),
            Err(err) => {
                tracing::error!(%id, %err, "screen capture failed");
                CaptureOutcome::Failed(err)
            }
        }
    }

    /// Begin and finish in one call, sleeping through the settle delay.
    pub fn capture_blocking(&mut self, id: WindowId, settle_delay: Duration) -> CaptureOutcome {
        let ticket = match self.begin_capture(id, Instant::now(), settle_delay) {
            Ok(ticket) => ticket,
            Err(err) => return CaptureOutcome::Failed(err),
        };
        if !settle_delay.is_zero() {
            std::thread::sleep(settle_delay);
        }
        self.finish_capture(ticket)
    }

    fn grab_window_region(&mut self, id: WindowId) -> OverlayResult<ScreenCapture> {
        let window_bounds = self.bounds(id)?;
        let display = self.nearest_display(id)?;
        let requested = display.physical_size();

        let sources = self
            .displays_mut()
            .capture_screen_sources(requested)
            .map_err(OverlayError::toolkit)?;
        let full = self
            .resolve_screen_source_for_display(display.index, &sources)?
            .cloned()
            .ok_or(OverlayError::CaptureUnavailable)?;

        let scale = effective_scale(full.width, display.bounds.width);
        if (full.width, full.height) != requested {
            let reported_scale = display.scale_factor;
            tracing::warn!(
                requested = ?requested,
                actual = ?(full.width, full.height),
                reported_scale,
                effective_scale = scale,
                "capture size differs from reported display scale"
            );
        }
        let crop = crop_rect_for_window(window_bounds, display.bounds, scale, full.width, full.height);
        tracing::debug!(%id, ?crop, effective_scale = scale, "capture crop computed");

        Ok(ScreenCapture {
            window_bounds,
            display,
            requested,
            effective_scale: scale,
            crop: crop.rect,
            clipped: crop.clipped,
            full,
        })
    }

    /// Guaranteed cleanup: show the window again and leave `Capturing`.
    fn restore_after_capture(&mut self, id: WindowId) {
        if let Err(err) = self.toolkit_mut().show(id) {
            tracing::error!(%id, ?err, "re-show after capture failed");
        }
        if let Ok(window) = self.registry_mut().window_mut(id) {
            window.mode = InteractionMode::Idle;
        }
    }
}
