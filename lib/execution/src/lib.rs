//! Simulated execution for flowcanvas workflows.
//!
//! The [`Simulator`] walks a graph in the order chosen by an
//! [`ExecutionOrderStrategy`], waits a random delay per node, and records
//! mock outputs. Time and randomness are injected through [`Clock`] and
//! [`RandomSource`] so runs can be made deterministic.

pub mod clock;
pub mod config;
pub mod error;
pub mod random;
pub mod simulator;
pub mod strategy;

pub use clock::{Clock, TokioClock, VirtualClock};
pub use config::SimulatorConfig;
pub use error::SimulatorError;
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use simulator::{ExecutionRequest, Simulator};
pub use strategy::{CollectionOrder, ExecutionOrderStrategy, OrderStrategyKind, TopologicalOrder};
