//! Canvas configuration.

use crate::error::CanvasConfigError;
use serde::Deserialize;

/// Smallest zoom the canvas supports.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom the canvas supports.
pub const MAX_ZOOM: f64 = 3.0;

/// Tunables for the canvas engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CanvasConfig {
    /// Lower zoom bound.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,

    /// Upper zoom bound.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    /// Multiplicative factor applied by one zoom-in or zoom-out step.
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,

    /// Distance in screen pixels within which a curve or port counts as hit.
    /// Wider than the rendered 2px stroke so thin curves stay selectable.
    #[serde(default = "default_hit_tolerance")]
    pub hit_tolerance: f64,

    /// Margin in screen pixels kept around the graph by fit-to-graph.
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f64,
}

fn default_min_zoom() -> f64 {
    MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    MAX_ZOOM
}

fn default_zoom_step() -> f64 {
    1.2
}

fn default_hit_tolerance() -> f64 {
    crate::router::HIT_TOLERANCE
}

fn default_fit_padding() -> f64 {
    40.0
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
            hit_tolerance: default_hit_tolerance(),
            fit_padding: default_fit_padding(),
        }
    }
}

impl CanvasConfig {
    /// Checks that the configured bounds, step, and distances are usable.
    ///
    /// # Errors
    ///
    /// Returns the first offending value.
    pub fn validate(&self) -> flowcanvas_core::Result<(), CanvasConfigError> {
        let bounds_ok = self.min_zoom.is_finite()
            && self.max_zoom.is_finite()
            && MIN_ZOOM <= self.min_zoom
            && self.min_zoom <= self.max_zoom
            && self.max_zoom <= MAX_ZOOM;
        if !bounds_ok {
            return Err(CanvasConfigError::ZoomBounds {
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
            }
            .into());
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(CanvasConfigError::ZoomStep {
                zoom_step: self.zoom_step,
            }
            .into());
        }
        for (field, value) in [
            ("hit_tolerance", self.hit_tolerance),
            ("fit_padding", self.fit_padding),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CanvasConfigError::Distance { field, value }.into());
            }
        }
        Ok(())
    }

    /// Clamps `zoom` into `[min_zoom, max_zoom]`, and never past
    /// [`MIN_ZOOM`]..=[`MAX_ZOOM`] even for a config that fails
    /// [`validate`](Self::validate).
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.max(self.min_zoom)
            .min(self.max_zoom)
            .clamp(MIN_ZOOM, MAX_ZOOM)
    }
}
