//! Error types for the editor binary.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EditorError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A workflow file could not be read or parsed.
    Import { path: PathBuf, details: String },
    /// An export could not be produced or written.
    Export { path: PathBuf, details: String },
    /// The workflow store rejected an operation.
    Persistence { details: String },
    /// The simulator refused to start.
    Simulation { details: String },
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::Import { path, details } => {
                write!(f, "failed to import '{}': {details}", path.display())
            }
            Self::Export { path, details } => {
                write!(f, "failed to export '{}': {details}", path.display())
            }
            Self::Persistence { details } => write!(f, "workflow store error: {details}"),
            Self::Simulation { details } => write!(f, "simulation error: {details}"),
        }
    }
}

impl std::error::Error for EditorError {}
