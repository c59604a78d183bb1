//! Session stores for the flowcanvas editor.
//!
//! - [`LogStore`]: bounded newest-first ring buffer of structured log entries
//!   with ordered synchronous fan-out
//! - [`HistoryStore`]: finished execution records with two-step deletion
//!
//! Both are explicitly constructed with `init` and torn down with `dispose`.

pub mod history;
pub mod log;

pub use history::{
    DeletionRequest, DeletionTarget, HistoryChange, HistoryConfig, HistoryError, HistoryFilter,
    HistoryStats, HistoryStore,
};
pub use log::{
    ExportedLogEntry, LogEntry, LogError, LogFilter, LogLevel, LogStats, LogStore, LogStoreConfig,
    NewLogEntry,
};
