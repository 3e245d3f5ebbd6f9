use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::geometry::Rect;
use crate::overlay::state::InteractionMode;
use crate::overlay::toolkit::WindowId;
use crate::overlay::transform::ImageState;
use std::collections::HashMap;
use std::time::Instant;

/// Authoritative geometry of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    pub id: WindowId,
    pub bounds: Rect,
    /// Snapshot from the last capture, load or paste; Reset returns here.
    pub original_bounds: Rect,
    /// While set and in the future, native resize notifications are echoes of
    /// our own writes and must not touch `bounds`.
    pub programmatic_move_until: Option<Instant>,
    pub mode: InteractionMode,
    pub border_width: f64,
    pub opacity: f32,
}

impl WindowState {
    pub fn new(id: WindowId, bounds: Rect, border_width: f64, opacity: f32) -> Self {
        Self {
            id,
            bounds,
            original_bounds: bounds,
            programmatic_move_until: None,
            mode: InteractionMode::Idle,
            border_width,
            opacity,
        }
    }

    pub fn is_programmatic_move(&self, now: Instant) -> bool {
        self.programmatic_move_until
            .is_some_and(|deadline| now < deadline)
    }

    /// Content area in window-relative coordinates.
    pub fn content_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.bounds.width, self.bounds.height).inset(self.border_width)
    }
}

#[derive(Debug, Clone)]
pub struct WindowEntry {
    pub window: WindowState,
    pub image: Option<ImageState>,
}

/// Every open window keyed by id. Handlers only ever touch the entry they
/// were addressed to.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    entries: HashMap<WindowId, WindowEntry>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, window: WindowState) {
        let id = window.id;
        if self
            .entries
            .insert(
                id,
                WindowEntry {
                    window,
                    image: None,
                },
            )
            .is_some()
        {
            tracing::warn!(%id, "window re-registered; previous state dropped");
        }
    }

    pub fn remove(&mut self, id: WindowId) -> Option<WindowEntry> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: WindowId) -> OverlayResult<&WindowEntry> {
        self.entries.get(&id).ok_or(OverlayError::WindowNotFound(id))
    }

    pub fn get_mut(&mut self, id: WindowId) -> OverlayResult<&mut WindowEntry> {
        self.entries
            .get_mut(&id)
            .ok_or(OverlayError::WindowNotFound(id))
    }

    pub fn window(&self, id: WindowId) -> OverlayResult<&WindowState> {
        self.get(id).map(|entry| &entry.window)
    }

    pub fn window_mut(&mut self, id: WindowId) -> OverlayResult<&mut WindowState> {
        self.get_mut(id).map(|entry| &mut entry.window)
    }

    pub fn ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn windows_mut(&mut self) -> impl Iterator<Item = &mut WindowState> {
        self.entries.values_mut().map(|entry| &mut entry.window)
    }
}

#[cfg(test)]
mod tests {
    use super::{WindowRegistry, WindowState};
    use crate::overlay::error::OverlayError;
    use crate::overlay::geometry::Rect;
    use crate::overlay::toolkit::WindowId;
    use std::time::{Duration, Instant};

    #[test]
    fn unknown_window_is_reported_not_found() {
        let registry = WindowRegistry::new();
        assert!(matches!(
            registry.window(WindowId(7)),
            Err(OverlayError::WindowNotFound(WindowId(7)))
        ));
    }

    #[test]
    fn removed_window_is_gone() {
        let mut registry = WindowRegistry::new();
        registry.insert(WindowState::new(
            WindowId(1),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            0.0,
            1.0,
        ));
        assert!(registry.contains(WindowId(1)));
        assert!(registry.remove(WindowId(1)).is_some());
        assert!(registry.is_empty());
        assert!(registry.window_mut(WindowId(1)).is_err());
    }

    #[test]
    fn programmatic_flag_expires_at_deadline() {
        let now = Instant::now();
        let mut state = WindowState::new(WindowId(1), Rect::default(), 0.0, 1.0);
        state.programmatic_move_until = Some(now + Duration::from_millis(50));
        assert!(state.is_programmatic_move(now));
        assert!(state.is_programmatic_move(now + Duration::from_millis(49)));
        assert!(!state.is_programmatic_move(now + Duration::from_millis(50)));
    }

    #[test]
    fn content_rect_excludes_border() {
        let state = WindowState::new(WindowId(1), Rect::new(40.0, 50.0, 100.0, 80.0), 2.0, 1.0);
        assert_eq!(state.content_rect(), Rect::new(2.0, 2.0, 96.0, 76.0));
    }
}
