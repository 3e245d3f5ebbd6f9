//! eframe front end: one overlay viewport driven by [`OverlaySession`].
//!
//! [`OverlaySession`]: crate::overlay::OverlaySession

pub mod app;
pub mod surface;
pub mod viewport;

pub use app::OverlayApp;
pub use surface::{EguiSurface, ShellState};
pub use viewport::ViewportCtx;
