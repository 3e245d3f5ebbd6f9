use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::geometry::{PixelRect, Point, Rect, Size};
use image::{ImageOutputFormat, RgbaImage};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Euclidean distance in RGB space; alpha is ignored.
    pub fn rgb_distance(self, other: Rgba) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Tightly packed, straight-alpha RGBA8 raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk[0] = fill.r;
            chunk[1] = fill.g;
            chunk[2] = fill.b;
            chunk[3] = fill.a;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> OverlayResult<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(OverlayError::InvalidRaster {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = self.index(x, y);
        Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        let idx = self.index(x, y);
        self.pixels[idx] = color.r;
        self.pixels[idx + 1] = color.g;
        self.pixels[idx + 2] = color.b;
        self.pixels[idx + 3] = color.a;
    }

    /// Copies `rect` out of the buffer, clamped to the buffer bounds.
    pub fn crop(&self, rect: PixelRect) -> RgbaBuffer {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let width = rect.width.min(self.width - x0);
        let height = rect.height.min(self.height - y0);

        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for row in y0..y0 + height {
            let start = self.index(x0, row);
            pixels.extend_from_slice(&self.pixels[start..start + width as usize * 4]);
        }
        RgbaBuffer {
            width,
            height,
            pixels,
        }
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn encode_png(&self) -> OverlayResult<Vec<u8>> {
        let image = self.to_image().ok_or(OverlayError::InvalidRaster {
            width: self.width,
            height: self.height,
            expected: self.width as usize * self.height as usize * 4,
            actual: self.pixels.len(),
        })?;
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageOutputFormat::Png)?;
        Ok(bytes.into_inner())
    }

    /// Decodes any format the `image` crate was built with.
    pub fn decode(bytes: &[u8]) -> OverlayResult<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from_image(decoded.to_rgba8()))
    }
}

/// What the presentation layer shows for one window: a background raster
/// stretched to `size` and placed at `position` (content-relative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlacement {
    pub size: Size,
    pub position: Point,
}

/// Software rendition of a presented layer, clipped to `view` (content
/// coordinates) and sampled at `pixel_scale` device pixels per logical pixel.
///
/// Nearest-neighbour sampling keeps keyed colours exact. Pixels outside the
/// layer come out fully transparent.
pub fn render_view(
    source: &RgbaBuffer,
    placement: LayerPlacement,
    view: Rect,
    pixel_scale: f64,
) -> RgbaBuffer {
    let out_w = (view.width * pixel_scale).floor().max(0.0) as u32;
    let out_h = (view.height * pixel_scale).floor().max(0.0) as u32;
    let mut out = RgbaBuffer::new(out_w, out_h, Rgba::TRANSPARENT);
    if source.is_empty() || placement.size.is_empty() {
        return out;
    }

    let sx = source.width as f64 / placement.size.width;
    let sy = source.height as f64 / placement.size.height;
    for py in 0..out_h {
        let ly = view.y + (py as f64 + 0.5) / pixel_scale - placement.position.y;
        if ly < 0.0 || ly >= placement.size.height {
            continue;
        }
        let src_y = ((ly * sy) as u32).min(source.height - 1);
        for px in 0..out_w {
            let lx = view.x + (px as f64 + 0.5) / pixel_scale - placement.position.x;
            if lx < 0.0 || lx >= placement.size.width {
                continue;
            }
            let src_x = ((lx * sx) as u32).min(source.width - 1);
            out.set_pixel(px, py, source.pixel(src_x, src_y));
        }
    }
    out
}
