use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Moves the window; the image travels with it.
    Window,
    /// Pans the image inside a stationary window.
    Image,
    /// Moves the window while the image stays put on screen.
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    ColorKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Idle,
    Dragging(DragKind),
    Capturing { ready_at: Instant },
    Editing(EditKind),
}

impl InteractionMode {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Capturing { .. })
    }
}

/// Every mode is entered from and left to `Idle`. Re-entering the current
/// mode is a no-op, except that a capture can never be restarted in flight.
pub fn can_transition(from: InteractionMode, to: InteractionMode) -> bool {
    use InteractionMode::*;
    matches!(
        (from, to),
        (Idle, Dragging(_))
            | (Dragging(_), Idle)
            | (Idle, Capturing { .. })
            | (Capturing { .. }, Idle)
            | (Idle, Editing(_))
            | (Editing(_), Idle)
    ) || (from == to && !from.is_capturing())
}
