//! Simulator error types.
//!
//! Node failures are not errors here: they end up as data on the execution
//! record and in the log store.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatorError {
    /// Another execution is still in flight on this simulator.
    AlreadyRunning,
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "an execution is already running"),
        }
    }
}

impl std::error::Error for SimulatorError {}
