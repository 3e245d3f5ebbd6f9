//! Geometry and interaction engine for transparent reference-image windows.

pub mod capture;
pub mod colorkey;
pub mod coordinator;
pub mod error;
pub mod export;
pub mod geometry;
pub mod messages;
pub mod monitor;
pub mod raster;
pub mod registry;
pub mod session;
pub mod state;
pub mod toolkit;
pub mod transform;

pub use capture::{CaptureOutcome, CaptureTicket, ScreenCapture};
pub use coordinator::{Coordinator, DragHandle};
pub use error::{OverlayError, OverlayResult};
pub use geometry::{BoundsPatch, IntRect, Point, Rect, Size};
pub use messages::{EventOutcome, WindowEvent};
pub use raster::{Rgba, RgbaBuffer};
pub use session::{ColorKeyReport, OverlayServices, OverlaySession, PasteOutcome};
pub use state::{DragKind, EditKind, InteractionMode};
pub use toolkit::{
    ClipboardService, DisplayInfo, DisplayService, FileDialogs, Presenter, WindowConfig, WindowId,
    WindowToolkit,
};
