//! Core types and utilities shared by every flowcanvas crate.
//!
//! This crate provides strongly-typed identifiers, the error-handling
//! foundation, and the synchronous event fan-out used by the graph model and
//! the log/history stores.

pub mod error;
pub mod id;
pub mod observer;

pub use error::Result;
pub use id::{ConnectionId, ExecutionId, LogEntryId, NodeId, ParseIdError, WorkflowId};
pub use observer::{Emitter, SubscriptionId};
