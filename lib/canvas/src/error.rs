//! Error types for the canvas crate.

use std::fmt;

/// A [`CanvasConfig`](crate::CanvasConfig) value the engine cannot work with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasConfigError {
    /// Zoom bounds are non-finite, inverted, or outside the supported range.
    ZoomBounds { min_zoom: f64, max_zoom: f64 },
    /// Zoom step must be finite and greater than 1.
    ZoomStep { zoom_step: f64 },
    /// Hit tolerance and fit padding must be finite and non-negative.
    Distance { field: &'static str, value: f64 },
}

impl fmt::Display for CanvasConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZoomBounds { min_zoom, max_zoom } => write!(
                f,
                "zoom bounds [{min_zoom}, {max_zoom}] must be ordered and within [{}, {}]",
                crate::config::MIN_ZOOM,
                crate::config::MAX_ZOOM
            ),
            Self::ZoomStep { zoom_step } => {
                write!(f, "zoom step {zoom_step} must be finite and greater than 1")
            }
            Self::Distance { field, value } => {
                write!(f, "{field} {value} must be finite and non-negative")
            }
        }
    }
}

impl std::error::Error for CanvasConfigError {}
