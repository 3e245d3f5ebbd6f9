//! Image placement math: zoom about a point, pan, window-relative zoom,
//! reset and crop-to-view.
//!
//! `offset` is relative to the window's content origin (inside the border).
//! Size and position are always recomputed together and handed to the
//! presenter as one [`LayerPlacement`].

use crate::overlay::geometry::{Point, Rect, Size};
use crate::overlay::raster::{LayerPlacement, RgbaBuffer};

#[derive(Debug, Clone, PartialEq)]
pub struct ImageState {
    pub source: RgbaBuffer,
    /// Size at scale 1.0, in logical pixels.
    pub logical_size: Size,
    pub scale: f64,
    pub offset: Point,
    pub origin_offset: Point,
}

impl ImageState {
    /// Binds a raster to a window. `pixel_scale` is the physical-per-logical
    /// ratio the raster was produced at (the effective scale for captures).
    pub fn from_raster(source: RgbaBuffer, pixel_scale: f64, offset: Point) -> Self {
        let pixel_scale = if pixel_scale > 0.0 { pixel_scale } else { 1.0 };
        let logical_size = Size::new(
            source.width as f64 / pixel_scale,
            source.height as f64 / pixel_scale,
        );
        Self {
            source,
            logical_size,
            scale: 1.0,
            offset,
            origin_offset: offset,
        }
    }

    pub fn displayed_size(&self) -> Size {
        self.logical_size.scaled(self.scale)
    }

    /// Displayed rectangle in content coordinates.
    pub fn displayed_rect(&self) -> Rect {
        Rect::from_origin_size(self.offset, self.displayed_size())
    }

    pub fn placement(&self) -> LayerPlacement {
        LayerPlacement {
            size: self.displayed_size(),
            position: self.offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 20.0,
        }
    }
}

impl ScaleLimits {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }
}

/// Rescales the image so the pixel under `pointer` (content coordinates)
/// stays under it. Returns the ratio that was applied; `1.0` means nothing
/// changed.
pub fn zoom_about_point(
    image: &mut ImageState,
    pointer: Point,
    requested_scale: f64,
    limits: ScaleLimits,
) -> f64 {
    let new_scale = limits.clamp(requested_scale);
    if image.scale <= 0.0 || new_scale == image.scale {
        return 1.0;
    }
    let ratio = new_scale / image.scale;
    let under_pointer = pointer - image.offset;
    image.offset = pointer - under_pointer * ratio;
    image.scale = new_scale;
    ratio
}

pub fn pan(image: &mut ImageState, start_offset: Point, delta: Point) {
    image.offset = start_offset + delta;
}

/// Scale and offset an image should take, computed ahead of being applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageView {
    pub scale: f64,
    pub offset: Point,
}

impl ImageView {
    pub fn apply_to(self, image: &mut ImageState) {
        image.scale = self.scale;
        image.offset = self.offset;
    }
}

/// Window geometry and image geometry after one window-relative zoom step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowZoom {
    pub ratio: f64,
    pub bounds: Rect,
    pub image: Option<ImageView>,
}

/// Limits a shrinking ratio so neither side of `window` drops below
/// `min_extent`. A window already at the floor cannot shrink further.
fn floor_ratio(window: Rect, ratio: f64, min_extent: f64) -> f64 {
    if ratio >= 1.0 {
        return ratio;
    }
    let smallest = window.width.min(window.height);
    if smallest - min_extent <= 1e-6 {
        return 1.0;
    }
    ratio.max(min_extent / smallest)
}

/// Computes the window rectangle for a zoom about `pointer_screen` and the
/// image view scaled by the same ratio so it stays locked to the window
/// content. Nothing is mutated; the caller applies the result once the
/// bounds write has gone through.
///
/// The ratio comes from the clamped image scale, then from the window size
/// floor, and is reused for both rectangles.
pub fn zoom_window(
    window: Rect,
    image: Option<&ImageState>,
    pointer_screen: Point,
    factor: f64,
    limits: ScaleLimits,
    min_extent: f64,
) -> WindowZoom {
    let unchanged = WindowZoom {
        ratio: 1.0,
        bounds: window,
        image: None,
    };
    let requested = match image {
        Some(image) if image.scale > 0.0 => limits.clamp(image.scale * factor) / image.scale,
        Some(_) => return unchanged,
        None => factor,
    };
    let ratio = floor_ratio(window, requested, min_extent);
    if ratio == 1.0 {
        return unchanged;
    }
    WindowZoom {
        ratio,
        bounds: window.scaled_about(pointer_screen, ratio),
        image: image.map(|image| ImageView {
            scale: image.scale * ratio,
            offset: image.offset * ratio,
        }),
    }
}

pub fn reset(image: &mut ImageState) {
    image.scale = 1.0;
    image.offset = image.origin_offset;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRequest {
    pub visible_width: f64,
    pub visible_height: f64,
    /// Screen-space center of the visible region; it stays fixed.
    pub visible_center: Point,
    pub border_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPlan {
    pub request: CropRequest,
    pub bounds: Rect,
    pub image_offset: Point,
}

/// Plans a crop of the window down to the visible part of the image.
///
/// `None` when image and content do not overlap. When the image already
/// covers the whole content area the plan reproduces the current geometry,
/// which makes repeated crops no-ops.
pub fn plan_crop(window: Rect, border_width: f64, image: &ImageState) -> Option<CropPlan> {
    let content = Rect::new(0.0, 0.0, window.width, window.height).inset(border_width);
    let image_rect = image
        .displayed_rect()
        .translate(Point::new(border_width, border_width));
    let visible = image_rect.intersect(&content)?;

    let visible_center = window.origin() + visible.center();
    let width = visible.width + 2.0 * border_width;
    let height = visible.height + 2.0 * border_width;
    let bounds = Rect::new(
        visible_center.x - width / 2.0,
        visible_center.y - height / 2.0,
        width,
        height,
    );
    let image_offset = image.offset - visible.origin() + Point::new(border_width, border_width);

    Some(CropPlan {
        request: CropRequest {
            visible_width: visible.width,
            visible_height: visible.height,
            visible_center,
            border_width,
        },
        bounds,
        image_offset,
    })
}
