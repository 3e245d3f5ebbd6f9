//! Seams to the operating system. The core only ever talks to these traits,
//! so it can be driven by the desktop shell or by recording fakes in tests.

use crate::overlay::geometry::{IntRect, Point, Rect, Size};
use crate::overlay::monitor::nearest_display_to_point;
use crate::overlay::raster::{Rgba, RgbaBuffer};
use anyhow::{anyhow, Result};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Creation options handed to the toolkit. The core does not interpret the
/// flags; they only travel to the native window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    pub size: Size,
    pub transparent: bool,
    pub frameless: bool,
    pub resizable: bool,
}

pub trait WindowToolkit {
    /// OS readback. Used once to seed authoritative state and nowhere else.
    fn outer_bounds(&self, id: WindowId) -> Result<IntRect>;
    fn set_bounds(&mut self, id: WindowId, bounds: IntRect) -> Result<()>;
    fn hide(&mut self, id: WindowId) -> Result<()>;
    fn show(&mut self, id: WindowId) -> Result<()>;
    fn is_alive(&self, id: WindowId) -> bool;
    /// Grabs what the window currently shows inside `rect` (window-relative,
    /// logical pixels) at device resolution.
    fn capture_page(&mut self, id: WindowId, rect: Rect) -> Result<RgbaBuffer>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayInfo {
    /// Position in the display list, used to match capture sources.
    pub index: usize,
    pub bounds: Rect,
    /// Advisory only; captures re-measure the real ratio.
    pub scale_factor: f64,
}

impl DisplayInfo {
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.bounds.width * self.scale_factor).floor() as u32,
            (self.bounds.height * self.scale_factor).floor() as u32,
        )
    }
}

pub trait DisplayService {
    fn list_displays(&self) -> Result<Vec<DisplayInfo>>;

    fn nearest_display_to_point(&self, point: Point) -> Result<DisplayInfo> {
        let displays = self.list_displays()?;
        nearest_display_to_point(&displays, point).ok_or_else(|| anyhow!("no displays reported"))
    }

    /// One raster per screen, in the capture API's own order.
    fn capture_screen_sources(&mut self, size_hint: (u32, u32)) -> Result<Vec<RgbaBuffer>>;
}

pub trait ClipboardService {
    fn write_image(&mut self, image: &RgbaBuffer) -> Result<()>;
    /// `Ok(None)` when the clipboard holds no image.
    fn read_image(&mut self) -> Result<Option<RgbaBuffer>>;
}

pub trait FileDialogs {
    fn open_image_file(&mut self) -> Option<PathBuf>;
    fn save_image_file(&mut self, suggested_name: &str) -> Option<PathBuf>;
}

/// Write-only view of the paintable surface.
pub trait Presenter {
    fn set_background(&mut self, id: WindowId, image: Option<&RgbaBuffer>);
    /// Size and position always travel together.
    fn set_layer(&mut self, id: WindowId, size: Size, position: Point);
    fn set_opacity(&mut self, id: WindowId, opacity: f32);
    fn set_border(&mut self, id: WindowId, width: f64, color: Rgba);
}
