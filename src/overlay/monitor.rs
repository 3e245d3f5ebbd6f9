use crate::overlay::geometry::Point;
use crate::overlay::toolkit::DisplayInfo;

pub fn display_contains_point(display: &DisplayInfo, point: Point) -> bool {
    display.bounds.contains(point)
}

/// Display under `point`, or the closest one when the point sits in a gap
/// between monitors or off-screen.
pub fn nearest_display_to_point(displays: &[DisplayInfo], point: Point) -> Option<DisplayInfo> {
    if let Some(hit) = displays
        .iter()
        .find(|display| display_contains_point(display, point))
    {
        return Some(*hit);
    }
    displays
        .iter()
        .min_by(|a, b| {
            a.bounds
                .distance_to(point)
                .total_cmp(&b.bounds.distance_to(point))
        })
        .copied()
}

/// Picks the raw capture source for `display_index`.
///
/// Sources carry no display id, so matching is positional: when there is one
/// source per display the index is used directly, otherwise source 0. This is
/// best effort and can pick the wrong screen on ambiguous setups.
pub fn resolve_screen_source_for_display<T>(
    display_index: usize,
    display_count: usize,
    sources: &[T],
) -> Option<&T> {
    if sources.len() == display_count && display_index < sources.len() {
        return sources.get(display_index);
    }
    if sources.len() > 1 {
        tracing::warn!(
            display_index,
            display_count,
            sources = sources.len(),
            "capture sources do not line up with displays; falling back to source 0"
        );
    }
    sources.first()
}
