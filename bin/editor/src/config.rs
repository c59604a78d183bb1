//! Editor configuration.
//!
//! Composes the configuration of every library crate. Values come from an
//! optional file, then `FLOWCANVAS__*` environment variables, for example
//! `FLOWCANVAS__LOGS__CAPACITY=500` or `FLOWCANVAS__SIMULATOR__ORDER=topological`.

use crate::error::EditorError;
use flowcanvas_canvas::CanvasConfig;
use flowcanvas_execution::SimulatorConfig;
use flowcanvas_store::{HistoryConfig, LogStoreConfig};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub logs: LogStoreConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub canvas: CanvasConfig,

    /// Screen size used when fitting the view to the graph.
    #[serde(default)]
    pub screen: ScreenConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: f64,

    #[serde(default = "default_screen_height")]
    pub height: f64,
}

fn default_screen_width() -> f64 {
    1280.0
}

fn default_screen_height() -> f64 {
    800.0
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

impl EditorConfig {
    /// Loads configuration from `path`, if given, overlaid with environment
    /// variables, and validates it.
    ///
    /// # Errors
    ///
    /// [`EditorError::Config`] if the file is missing, a value cannot be
    /// parsed, or [`validate`](Self::validate) rejects the result.
    pub fn load(path: Option<&Path>) -> flowcanvas_core::Result<Self, EditorError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("FLOWCANVAS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| EditorError::Config {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the libraries cannot run with.
    ///
    /// # Errors
    ///
    /// [`EditorError::Config`] naming the first invalid section.
    pub fn validate(&self) -> flowcanvas_core::Result<(), EditorError> {
        self.logs.validate().map_err(|e| EditorError::Config {
            details: format!("logs: {}", e.current_context()),
        })?;
        self.canvas.validate().map_err(|e| EditorError::Config {
            details: format!("canvas: {}", e.current_context()),
        })?;
        Ok(())
    }
}
