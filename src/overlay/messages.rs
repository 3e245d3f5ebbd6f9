use crate::overlay::geometry::{Point, Size};
use crate::overlay::toolkit::WindowId;

/// Native window notifications, funnelled through one channel so the
/// coordinator applies its suppression rules in a single place.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    Resized { id: WindowId, size: Size },
    Moved { id: WindowId, position: Point },
    Closed { id: WindowId },
}

impl WindowEvent {
    pub fn window_id(&self) -> WindowId {
        match self {
            Self::Resized { id, .. } | Self::Moved { id, .. } | Self::Closed { id } => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Suppressed,
    Ignored,
    Closed,
}
