use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::geometry::Point;
use crate::overlay::raster::{Rgba, RgbaBuffer};

pub const MAX_TOLERANCE: f64 = 100.0;

/// Parses a user-entered tolerance. Anything non-numeric or outside
/// `0..=100` is rejected before any state is touched.
pub fn parse_tolerance(input: &str) -> OverlayResult<f64> {
    let trimmed = input.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| OverlayError::InvalidToleranceInput(trimmed.to_string()))?;
    validate_tolerance(value).map_err(|_| OverlayError::InvalidToleranceInput(trimmed.to_string()))
}

pub fn validate_tolerance(value: f64) -> OverlayResult<f64> {
    if value.is_finite() && (0.0..=MAX_TOLERANCE).contains(&value) {
        Ok(value)
    } else {
        Err(OverlayError::InvalidToleranceInput(value.to_string()))
    }
}

/// Maps a window-relative click to the physical pixel of a content capture.
/// Returns `None` when the click lands on the border or outside the raster.
pub fn sample_point(
    click: Point,
    border_width: f64,
    pixel_scale: f64,
    raster: &RgbaBuffer,
) -> Option<(u32, u32)> {
    let x = ((click.x - border_width) * pixel_scale).floor();
    let y = ((click.y - border_width) * pixel_scale).floor();
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= raster.width || y >= raster.height {
        return None;
    }
    Some((x, y))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorKeyResult {
    pub image: RgbaBuffer,
    pub reference: Rgba,
    pub keyed_pixels: usize,
}

/// Zeroes the alpha of every pixel within `tolerance` (Euclidean RGB
/// distance) of `reference`.
pub fn apply_color_key(raster: &RgbaBuffer, reference: Rgba, tolerance: f64) -> ColorKeyResult {
    let mut image = raster.clone();
    let mut keyed_pixels = 0;
    for px in image.pixels.chunks_exact_mut(4) {
        let color = Rgba::rgba(px[0], px[1], px[2], px[3]);
        if color.rgb_distance(reference) <= tolerance {
            px[3] = 0;
            keyed_pixels += 1;
        }
    }
    ColorKeyResult {
        image,
        reference,
        keyed_pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_color_key, parse_tolerance, sample_point};
    use crate::overlay::error::OverlayError;
    use crate::overlay::geometry::Point;
    use crate::overlay::raster::{Rgba, RgbaBuffer};

    #[test]
    fn tolerance_parser_rejects_out_of_range_and_garbage() {
        assert_eq!(parse_tolerance(" 42 ").expect("valid"), 42.0);
        assert_eq!(parse_tolerance("0").expect("valid"), 0.0);
        assert_eq!(parse_tolerance("100").expect("valid"), 100.0);
        for input in ["-1", "100.5", "abc", "", "NaN", "inf"] {
            assert!(
                matches!(
                    parse_tolerance(input),
                    Err(OverlayError::InvalidToleranceInput(_))
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn sample_point_accounts_for_border_and_scale() {
        let raster = RgbaBuffer::new(200, 100, Rgba::TRANSPARENT);
        assert_eq!(sample_point(Point::new(12.0, 7.0), 2.0, 2.0, &raster), Some((20, 10)));
        assert_eq!(sample_point(Point::new(1.0, 7.0), 2.0, 2.0, &raster), None);
        assert_eq!(sample_point(Point::new(102.0, 7.0), 2.0, 2.0, &raster), None);
    }

    #[test]
    fn exact_match_only_at_zero_tolerance() {
        let raster = RgbaBuffer::from_pixels(
            3,
            1,
            vec![10, 10, 10, 255, 11, 10, 10, 255, 200, 200, 200, 255],
        )
        .expect("raster");
        let keyed = apply_color_key(&raster, Rgba::rgba(10, 10, 10, 255), 0.0);
        assert_eq!(keyed.keyed_pixels, 1);
        assert_eq!(keyed.image.pixel(0, 0).a, 0);
        assert_eq!(keyed.image.pixel(1, 0).a, 255);
        assert_eq!(keyed.image.pixel(0, 0).r, 10);
    }
}
