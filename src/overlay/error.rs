use crate::overlay::toolkit::WindowId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// The window was closed or never registered. Not worth retrying.
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
    #[error("no screen capture source available")]
    CaptureUnavailable,
    #[error("tolerance must be a number between 0 and 100, got {0:?}")]
    InvalidToleranceInput(String),
    #[error("window {window} is busy ({reason})")]
    Busy {
        window: WindowId,
        reason: &'static str,
    },
    #[error("window {0} has no image loaded")]
    NoImage(WindowId),
    #[error("raster of {width}x{height} expects {expected} bytes, got {actual}")]
    InvalidRaster {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("toolkit call failed: {0}")]
    Toolkit(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OverlayError {
    pub fn toolkit(err: anyhow::Error) -> Self {
        Self::Toolkit(format!("{err:#}"))
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;
