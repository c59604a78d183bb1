//! Structured log store.
//!
//! A bounded, newest-first ring buffer of [`LogEntry`] values with
//! synchronous fan-out. Every mutation notifies all subscribers with the
//! full updated sequence before returning, and mutations are serialized with
//! their notification, so subscribers observe entries in insertion order and
//! never see a count go backwards except through [`LogStore::clear_logs`].
//!
//! Listeners may read the store while being notified but must not add or
//! clear entries from inside a notification.

use chrono::{DateTime, Utc};
use flowcanvas_core::{Emitter, ExecutionId, LogEntryId, NodeId, SubscriptionId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    /// Every level, in display order.
    pub const ALL: [Self; 5] = [
        Self::Info,
        Self::Success,
        Self::Warning,
        Self::Error,
        Self::Debug,
    ];
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// One immutable log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<ExecutionId>,
}

/// A log entry before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    pub details: Option<JsonValue>,
    pub node_id: Option<NodeId>,
    pub execution_id: Option<ExecutionId>,
}

impl NewLogEntry {
    #[must_use]
    pub fn new(level: LogLevel, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            category: category.into(),
            message: message.into(),
            details: None,
            node_id: None,
            execution_id: None,
        }
    }

    #[must_use]
    pub fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, category, message)
    }

    #[must_use]
    pub fn success(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, category, message)
    }

    #[must_use]
    pub fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, category, message)
    }

    #[must_use]
    pub fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, category, message)
    }

    #[must_use]
    pub fn debug(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, category, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    #[must_use]
    pub fn with_execution(mut self, execution_id: ExecutionId) -> Self {
        self.execution_id = Some(execution_id);
        self
    }
}

/// Conjunctive filter over log entries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub category: Option<String>,
    pub node_id: Option<NodeId>,
    /// Case-insensitive substring of the message or the category.
    pub search: Option<String>,
}

impl LogFilter {
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    #[must_use]
    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    /// Returns true if `entry` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if self.level.is_some_and(|level| entry.level != level) {
            return false;
        }
        if self
            .category
            .as_deref()
            .is_some_and(|category| entry.category != category)
        {
            return false;
        }
        if self.node_id.is_some_and(|id| entry.node_id != Some(id)) {
            return false;
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            if !entry.message.to_lowercase().contains(&needle)
                && !entry.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Per-level counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub total: usize,
    pub info: usize,
    pub success: usize,
    pub warning: usize,
    pub error: usize,
    pub debug: usize,
}

/// Export form of an entry: the store-assigned id is not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<ExecutionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl From<&LogEntry> for ExportedLogEntry {
    fn from(entry: &LogEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            level: entry.level,
            category: entry.category.clone(),
            message: entry.message.clone(),
            node_id: entry.node_id,
            execution_id: entry.execution_id,
            details: entry.details.clone(),
        }
    }
}

/// Errors from log configuration, import, and export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    /// The configured capacity retains nothing.
    ZeroCapacity,
    /// The import data is not a JSON array of exported entries.
    InvalidFormat { details: String },
    /// Serialization failed.
    Serialization { details: String },
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "log capacity must be at least 1"),
            Self::InvalidFormat { details } => write!(f, "invalid log export: {details}"),
            Self::Serialization { details } => write!(f, "log serialization failed: {details}"),
        }
    }
}

impl std::error::Error for LogError {}

/// Log store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogStoreConfig {
    /// Maximum number of retained entries.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    1000
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl LogStoreConfig {
    /// # Errors
    ///
    /// [`LogError::ZeroCapacity`] for a capacity of 0.
    pub fn validate(&self) -> flowcanvas_core::Result<(), LogError> {
        if self.capacity == 0 {
            return Err(LogError::ZeroCapacity.into());
        }
        Ok(())
    }
}

struct LogState {
    /// Newest first.
    entries: VecDeque<LogEntry>,
    last_timestamp: Option<DateTime<Utc>>,
}

struct Inner {
    capacity: usize,
    state: Mutex<LogState>,
    /// Held across a mutation and its notification.
    dispatch: Mutex<()>,
    listeners: Emitter<Vec<LogEntry>>,
    disposed: AtomicBool,
}

/// Handle to a log store. Clones share the same buffer and subscribers.
#[derive(Clone)]
pub struct LogStore {
    inner: Arc<Inner>,
}

impl LogStore {
    /// Creates a live store. A capacity of 0 retains no entries; callers
    /// loading user configuration reject it through
    /// [`LogStoreConfig::validate`].
    #[must_use]
    pub fn init(config: LogStoreConfig) -> Self {
        debug!(capacity = config.capacity, "log store initialized");
        Self {
            inner: Arc::new(Inner {
                capacity: config.capacity,
                state: Mutex::new(LogState {
                    entries: VecDeque::with_capacity(config.capacity.min(4096)),
                    last_timestamp: None,
                }),
                dispatch: Mutex::new(()),
                listeners: Emitter::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Drops every subscriber and entry. Later additions are ignored.
    pub fn dispose(&self) {
        let _dispatch = self.lock_dispatch();
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.listeners.clear();
        self.lock_state().entries.clear();
        debug!("log store disposed");
    }

    /// Returns true once [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LogState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dispatch(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Assigns an id and timestamp, prepends the entry, evicts past capacity,
    /// and notifies subscribers.
    ///
    /// Returns `None` after the store has been disposed.
    pub fn add_log(&self, new: NewLogEntry) -> Option<LogEntry> {
        let _dispatch = self.lock_dispatch();
        if self.is_disposed() {
            return None;
        }

        let (entry, snapshot) = {
            let mut state = self.lock_state();
            let now = Utc::now();
            let timestamp = state.last_timestamp.map_or(now, |last| last.max(now));
            state.last_timestamp = Some(timestamp);

            let entry = LogEntry {
                id: LogEntryId::new(),
                timestamp,
                level: new.level,
                category: new.category,
                message: new.message,
                details: new.details,
                node_id: new.node_id,
                execution_id: new.execution_id,
            };
            state.entries.push_front(entry.clone());
            state.entries.truncate(self.inner.capacity);
            (entry, state.entries.iter().cloned().collect::<Vec<_>>())
        };

        trace!(level = %entry.level, category = %entry.category, "log entry added");
        self.inner.listeners.emit(&snapshot);
        Some(entry)
    }

    /// Returns matching entries, newest first.
    #[must_use]
    pub fn get_logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.lock_state()
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Returns every entry, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<LogEntry> {
        self.get_logs(&LogFilter::default())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry and notifies subscribers with an empty list.
    pub fn clear_logs(&self) {
        let _dispatch = self.lock_dispatch();
        if self.is_disposed() {
            return;
        }
        self.lock_state().entries.clear();
        self.inner.listeners.emit(&Vec::new());
    }

    /// Registers a listener that receives the full sequence after every
    /// mutation.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Vec<LogEntry>) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    /// Counts entries per level.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        let state = self.lock_state();
        let mut stats = LogStats {
            total: state.entries.len(),
            ..LogStats::default()
        };
        for entry in &state.entries {
            match entry.level {
                LogLevel::Info => stats.info += 1,
                LogLevel::Success => stats.success += 1,
                LogLevel::Warning => stats.warning += 1,
                LogLevel::Error => stats.error += 1,
                LogLevel::Debug => stats.debug += 1,
            }
        }
        stats
    }

    /// Distinct categories, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.lock_state()
            .entries
            .iter()
            .map(|e| e.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Serializes matching entries, newest first, as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Serialization`] if serialization fails.
    pub fn export_json(&self, filter: &LogFilter) -> Result<String, LogError> {
        let exported: Vec<ExportedLogEntry> = self
            .get_logs(filter)
            .iter()
            .map(ExportedLogEntry::from)
            .collect();
        serde_json::to_string_pretty(&exported).map_err(|e| LogError::Serialization {
            details: e.to_string(),
        })
    }

    /// Replaces the contents with an exported array (newest first). Fresh
    /// ids are assigned; timestamps are kept. Entries past capacity are
    /// dropped from the old end. Subscribers are notified once.
    ///
    /// Returns the number of entries retained.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidFormat`] if the data cannot be parsed; the
    /// store is unchanged.
    pub fn import_json(&self, data: &str) -> Result<usize, LogError> {
        let imported: Vec<ExportedLogEntry> =
            serde_json::from_str(data).map_err(|e| LogError::InvalidFormat {
                details: e.to_string(),
            })?;

        let _dispatch = self.lock_dispatch();
        if self.is_disposed() {
            return Ok(0);
        }
        let snapshot = {
            let mut state = self.lock_state();
            state.entries = imported
                .into_iter()
                .take(self.inner.capacity)
                .map(|e| LogEntry {
                    id: LogEntryId::new(),
                    timestamp: e.timestamp,
                    level: e.level,
                    category: e.category,
                    message: e.message,
                    details: e.details,
                    node_id: e.node_id,
                    execution_id: e.execution_id,
                })
                .collect();
            state.last_timestamp = state.entries.iter().map(|e| e.timestamp).max();
            state.entries.iter().cloned().collect::<Vec<_>>()
        };
        let count = snapshot.len();
        debug!(count, "log entries imported");
        self.inner.listeners.emit(&snapshot);
        Ok(count)
    }
}

impl fmt::Debug for LogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStore")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize) -> LogStore {
        LogStore::init(LogStoreConfig { capacity })
    }

    #[test]
    fn newest_first() {
        let logs = store(10);
        logs.add_log(NewLogEntry::info("workflow", "first"));
        logs.add_log(NewLogEntry::info("workflow", "second"));
        let all = logs.all();
        assert_eq!(all[0].message, "second");
        assert_eq!(all[1].message, "first");
        assert!(all[0].timestamp >= all[1].timestamp);
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let logs = store(3);
        for i in 0..5 {
            logs.add_log(NewLogEntry::info("node", format!("m{i}")));
        }
        let messages: Vec<_> = logs.all().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["m4", "m3", "m2"]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = LogStoreConfig { capacity: 0 };
        assert_eq!(
            config.validate().map_err(|e| e.current_context().clone()),
            Err(LogError::ZeroCapacity)
        );
        assert!(LogStoreConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_store_keeps_nothing() {
        let logs = store(0);
        assert_eq!(logs.capacity(), 0);
        logs.add_log(NewLogEntry::info("workflow", "dropped"));
        assert!(logs.is_empty());
    }

    #[test]
    fn default_capacity_is_one_thousand() {
        assert_eq!(LogStore::init(LogStoreConfig::default()).capacity(), 1000);
    }

    #[test]
    fn filters_combine_with_and() {
        let logs = store(10);
        let node = NodeId::new();
        logs.add_log(NewLogEntry::info("node", "Starting HTTP").with_node(node));
        logs.add_log(NewLogEntry::success("node", "HTTP done").with_node(node));
        logs.add_log(NewLogEntry::success("workflow", "All done"));

        assert_eq!(logs.get_logs(&LogFilter::default().level(LogLevel::Success)).len(), 2);
        assert_eq!(
            logs.get_logs(&LogFilter::default().level(LogLevel::Success).node(node))
                .len(),
            1
        );
        assert_eq!(logs.get_logs(&LogFilter::default().search("http")).len(), 2);
        assert_eq!(logs.get_logs(&LogFilter::default().search("WORK")).len(), 1);
        assert_eq!(logs.get_logs(&LogFilter::default().category("node")).len(), 2);
    }

    #[test]
    fn subscribers_see_every_mutation_in_order() {
        let logs = store(10);
        let counts = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&counts);
        let id = logs.subscribe(move |entries| sink.lock().unwrap().push(entries.len()));

        logs.add_log(NewLogEntry::info("a", "1"));
        logs.add_log(NewLogEntry::info("a", "2"));
        logs.clear_logs();
        assert!(logs.unsubscribe(id));
        logs.add_log(NewLogEntry::info("a", "3"));

        assert_eq!(*counts.lock().unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn listener_can_read_during_notification() {
        let logs = store(10);
        let reader = logs.clone();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        logs.subscribe(move |_| *sink.lock().unwrap() = reader.len());
        logs.add_log(NewLogEntry::debug("a", "x"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn stats_and_categories() {
        let logs = store(10);
        logs.add_log(NewLogEntry::info("workflow", "a"));
        logs.add_log(NewLogEntry::error("node", "b"));
        logs.add_log(NewLogEntry::error("node", "c"));
        let stats = logs.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.error, 2);
        assert_eq!(stats.info, 1);
        assert_eq!(logs.categories(), vec!["node", "workflow"]);
    }

    #[test]
    fn export_import_is_lossless() {
        let logs = store(10);
        let exec = ExecutionId::new();
        logs.add_log(NewLogEntry::info("workflow", "start").with_execution(exec));
        logs.add_log(
            NewLogEntry::success("node", "done")
                .with_node(NodeId::new())
                .with_details(serde_json::json!({"durationMs": 900})),
        );
        let exported = logs.export_json(&LogFilter::default()).unwrap();
        assert!(!exported.contains("\"id\""));

        let other = store(10);
        assert_eq!(other.import_json(&exported).unwrap(), 2);
        assert_eq!(other.export_json(&LogFilter::default()).unwrap(), exported);
        assert!(other.import_json("not json").is_err());
        assert_eq!(other.len(), 2);
    }

    #[test]
    fn disposed_store_ignores_entries() {
        let logs = store(10);
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        logs.subscribe(move |_| *sink.lock().unwrap() += 1);
        logs.dispose();
        assert!(logs.add_log(NewLogEntry::info("a", "b")).is_none());
        assert!(logs.is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
