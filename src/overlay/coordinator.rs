//! Single authority for window geometry.
//!
//! Bounds live here as `f64` logical pixels and are pushed to the toolkit
//! rounded, never pulled back. The only OS-originated change that becomes
//! authoritative is a manual resize arriving outside the programmatic-move
//! grace window, and even then only width and height.

use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::geometry::{BoundsPatch, Point, Rect, Size};
use crate::overlay::messages::{EventOutcome, WindowEvent};
use crate::overlay::monitor::resolve_screen_source_for_display;
use crate::overlay::registry::{WindowRegistry, WindowState};
use crate::overlay::state::{can_transition, DragKind, InteractionMode};
use crate::overlay::toolkit::{DisplayInfo, DisplayService, WindowId, WindowToolkit};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

pub const DEFAULT_PROGRAMMATIC_MOVE_GRACE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragHandle {
    pub window_id: WindowId,
    pub kind: DragKind,
    pub start_bounds: Rect,
    pub pointer_offset: Point,
}

pub struct Coordinator {
    registry: WindowRegistry,
    toolkit: Box<dyn WindowToolkit>,
    displays: Box<dyn DisplayService>,
    grace: Duration,
}

impl Coordinator {
    pub fn new(toolkit: Box<dyn WindowToolkit>, displays: Box<dyn DisplayService>) -> Self {
        Self {
            registry: WindowRegistry::new(),
            toolkit,
            displays,
            grace: DEFAULT_PROGRAMMATIC_MOVE_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WindowRegistry {
        &mut self.registry
    }

    pub(crate) fn toolkit_mut(&mut self) -> &mut dyn WindowToolkit {
        self.toolkit.as_mut()
    }

    pub(crate) fn displays_mut(&mut self) -> &mut dyn DisplayService {
        self.displays.as_mut()
    }

    /// Seeds authoritative state from the toolkit. This is the one place OS
    /// readback is trusted for position.
    pub fn register_window(
        &mut self,
        id: WindowId,
        border_width: f64,
        opacity: f32,
    ) -> OverlayResult<Rect> {
        let seeded = self
            .toolkit
            .outer_bounds(id)
            .map_err(OverlayError::toolkit)?
            .to_rect();
        self.registry
            .insert(WindowState::new(id, seeded, border_width, opacity));
        tracing::debug!(%id, ?seeded, "window registered");
        Ok(seeded)
    }

    pub fn remove_window(&mut self, id: WindowId) -> bool {
        let removed = self.registry.remove(id).is_some();
        if removed {
            tracing::debug!(%id, "window removed");
        }
        removed
    }

    pub fn bounds(&self, id: WindowId) -> OverlayResult<Rect> {
        self.registry.window(id).map(|w| w.bounds)
    }

    pub fn mode(&self, id: WindowId) -> OverlayResult<InteractionMode> {
        self.registry.window(id).map(|w| w.mode)
    }

    pub fn set_mode(&mut self, id: WindowId, next: InteractionMode) -> OverlayResult<()> {
        let window = self.registry.window_mut(id)?;
        if !can_transition(window.mode, next) {
            return Err(OverlayError::Busy {
                window: id,
                reason: busy_reason(window.mode),
            });
        }
        window.mode = next;
        Ok(())
    }

    pub fn begin_drag(
        &mut self,
        id: WindowId,
        pointer_screen: Point,
        kind: DragKind,
    ) -> OverlayResult<DragHandle> {
        self.set_mode(id, InteractionMode::Dragging(kind))?;
        let start_bounds = self.bounds(id)?;
        Ok(DragHandle {
            window_id: id,
            kind,
            start_bounds,
            pointer_offset: pointer_screen - start_bounds.origin(),
        })
    }

    /// Moves the window under the pointer. Width and height always come from
    /// the handle, so a drag can never grow the window.
    pub fn apply_drag(
        &mut self,
        handle: &DragHandle,
        pointer_screen: Point,
        now: Instant,
    ) -> OverlayResult<Rect> {
        let position = pointer_screen - handle.pointer_offset;
        let next = Rect::new(
            position.x,
            position.y,
            handle.start_bounds.width,
            handle.start_bounds.height,
        );
        self.commit_bounds(handle.window_id, next, now)
    }

    pub fn end_drag(&mut self, id: WindowId) -> OverlayResult<()> {
        if matches!(self.mode(id)?, InteractionMode::Dragging(_)) {
            self.set_mode(id, InteractionMode::Idle)?;
        }
        Ok(())
    }

    /// Read-modify-write on the authoritative copy, then one rounded write to
    /// the toolkit.
    pub fn set_bounds(
        &mut self,
        id: WindowId,
        patch: BoundsPatch,
        now: Instant,
    ) -> OverlayResult<Rect> {
        let current = self.bounds(id)?;
        self.commit_bounds(id, patch.apply_to(current), now)
    }

    /// The toolkit write comes first. Authoritative bounds and the grace
    /// deadline only change once it has been accepted.
    fn commit_bounds(&mut self, id: WindowId, next: Rect, now: Instant) -> OverlayResult<Rect> {
        self.registry.window(id)?;
        let rounded = next.to_int_rect();
        tracing::debug!(%id, ?next, ?rounded, "authoritative bounds write");
        if let Err(err) = self.toolkit.set_bounds(id, rounded) {
            tracing::error!(%id, ?err, "toolkit rejected bounds write");
            return Err(OverlayError::toolkit(err));
        }

        let grace = self.grace;
        let window = self.registry.window_mut(id)?;
        window.bounds = next;
        window.programmatic_move_until = Some(now + grace);
        Ok(next)
    }

    /// Applies a native resize notification. Echoes of our own writes are
    /// dropped; genuine manual resizes update width and height only.
    pub fn on_native_resize(
        &mut self,
        id: WindowId,
        reported: Size,
        now: Instant,
    ) -> OverlayResult<EventOutcome> {
        let window = self.registry.window_mut(id)?;
        if window.is_programmatic_move(now) {
            tracing::debug!(%id, ?reported, "resize during programmatic move discarded");
            return Ok(EventOutcome::Suppressed);
        }
        if window.bounds.width == reported.width && window.bounds.height == reported.height {
            return Ok(EventOutcome::Ignored);
        }
        window.bounds.width = reported.width;
        window.bounds.height = reported.height;
        tracing::debug!(%id, ?reported, "manual resize recorded");
        Ok(EventOutcome::Applied)
    }

    pub fn handle_event(&mut self, event: WindowEvent, now: Instant) -> OverlayResult<EventOutcome> {
        match event {
            WindowEvent::Resized { id, size } => self.on_native_resize(id, size, now),
            WindowEvent::Moved { id, position } => {
                // Position readback is never authoritative.
                tracing::trace!(%id, ?position, "native move ignored");
                self.registry.window(id)?;
                Ok(EventOutcome::Ignored)
            }
            WindowEvent::Closed { id } => {
                self.remove_window(id);
                Ok(EventOutcome::Closed)
            }
        }
    }

    /// Drains every queued native event. Events for windows that are already
    /// gone are logged and skipped.
    pub fn pump_events(
        &mut self,
        rx: &Receiver<WindowEvent>,
        now: Instant,
    ) -> Vec<(WindowId, EventOutcome)> {
        let mut outcomes = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    let id = event.window_id();
                    match self.handle_event(event, now) {
                        Ok(outcome) => outcomes.push((id, outcome)),
                        Err(err) => tracing::warn!(%id, %err, "window event dropped"),
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        outcomes
    }

    /// Clears programmatic-move flags whose grace window has elapsed.
    pub fn tick(&mut self, now: Instant) {
        for window in self.registry.windows_mut() {
            if window
                .programmatic_move_until
                .is_some_and(|deadline| now >= deadline)
            {
                window.programmatic_move_until = None;
            }
        }
    }

    /// Display under the window's current center. Recomputed on every call
    /// because the window may have crossed a monitor boundary.
    pub fn nearest_display(&self, id: WindowId) -> OverlayResult<DisplayInfo> {
        let center = self.bounds(id)?.center();
        self.displays
            .nearest_display_to_point(center)
            .map_err(OverlayError::toolkit)
    }

    pub fn resolve_screen_source_for_display<'a, T>(
        &self,
        display_index: usize,
        sources: &'a [T],
    ) -> OverlayResult<Option<&'a T>> {
        let display_count = self
            .displays
            .list_displays()
            .map_err(OverlayError::toolkit)?
            .len();
        Ok(resolve_screen_source_for_display(
            display_index,
            display_count,
            sources,
        ))
    }
}

fn busy_reason(mode: InteractionMode) -> &'static str {
    match mode {
        InteractionMode::Idle => "idle",
        InteractionMode::Dragging(_) => "drag in progress",
        InteractionMode::Capturing { .. } => "capture in flight",
        InteractionMode::Editing(_) => "edit in progress",
    }
}
