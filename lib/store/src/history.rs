//! Execution history store.
//!
//! Keeps finished [`ExecutionRecord`]s most recent first, optionally capped.
//! Deleting a record or clearing the store takes two steps: a request that
//! describes what will be removed, then a confirmation of that request.

use flowcanvas_core::{Emitter, ExecutionId, SubscriptionId};
use flowcanvas_workflow::{ExecutionMode, ExecutionRecord, ExecutionStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info};

/// History store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Maximum retained records. `None` keeps everything.
    #[serde(default)]
    pub max_items: Option<usize>,
}

/// Errors from history operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Only terminal records may be stored.
    NotTerminal {
        id: ExecutionId,
        status: ExecutionStatus,
    },
    /// No record with this id.
    NotFound { id: ExecutionId },
    /// The deletion request was already confirmed, cancelled, or issued by
    /// another store.
    StaleRequest,
    /// The store has been disposed.
    Disposed,
    /// Serialization failed.
    Serialization { details: String },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotTerminal { id, status } => {
                write!(f, "execution {id} is still {status} and cannot be recorded")
            }
            Self::NotFound { id } => write!(f, "execution {id} not found in history"),
            Self::StaleRequest => write!(f, "deletion request is no longer pending"),
            Self::Disposed => write!(f, "history store has been disposed"),
            Self::Serialization { details } => write!(f, "serialization failed: {details}"),
        }
    }
}

impl std::error::Error for HistoryError {}

/// Conjunctive filter over records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub status: Option<ExecutionStatus>,
    pub mode: Option<ExecutionMode>,
    /// Case-insensitive substring of the workflow name, trigger, or id.
    pub search: Option<String>,
}

impl HistoryFilter {
    #[must_use]
    pub fn status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    #[must_use]
    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        if self.status.is_some_and(|s| record.status != s) {
            return false;
        }
        if self.mode.is_some_and(|m| record.mode != m) {
            return false;
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let hit = record.workflow_name.to_lowercase().contains(&needle)
                || record.triggered_by.to_lowercase().contains(&needle)
                || record.id.to_string().to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// What a pending deletion will remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTarget {
    Record(ExecutionId),
    All,
}

/// A pending deletion awaiting confirmation.
///
/// Dropping a request without confirming it withdraws it.
#[derive(Debug)]
pub struct DeletionRequest {
    token: u64,
    target: DeletionTarget,
    affected: usize,
    store: Weak<Inner>,
}

impl Drop for DeletionRequest {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending
                .remove(&self.token);
        }
    }
}

impl DeletionRequest {
    #[must_use]
    pub fn target(&self) -> DeletionTarget {
        self.target
    }

    /// Number of records that would be removed if confirmed now.
    #[must_use]
    pub fn affected(&self) -> usize {
        self.affected
    }

    /// Human-readable confirmation prompt.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self.target {
            DeletionTarget::Record(id) => format!("Delete execution {id}?"),
            DeletionTarget::All => {
                format!("Clear all {} executions from history?", self.affected)
            }
        }
    }
}

/// Notification published after every history mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryChange {
    Added { id: ExecutionId },
    Evicted { ids: Vec<ExecutionId> },
    Deleted { id: ExecutionId },
    Cleared { count: usize },
}

/// Aggregate view of the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub cancelled: usize,
    /// Mean wall-clock duration of records with an end time.
    pub average_duration_ms: Option<f64>,
}

struct HistoryState {
    /// Most recent first.
    records: VecDeque<ExecutionRecord>,
    pending: HashMap<u64, DeletionTarget>,
    next_token: u64,
}

struct Inner {
    max_items: Option<usize>,
    state: Mutex<HistoryState>,
    listeners: Emitter<HistoryChange>,
    disposed: AtomicBool,
}

/// Handle to an execution history. Clones share the same records.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<Inner>,
}

impl HistoryStore {
    #[must_use]
    pub fn init(config: HistoryConfig) -> Self {
        debug!(max_items = ?config.max_items, "history store initialized");
        Self {
            inner: Arc::new(Inner {
                max_items: config.max_items,
                state: Mutex::new(HistoryState {
                    records: VecDeque::new(),
                    pending: HashMap::new(),
                    next_token: 1,
                }),
                listeners: Emitter::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Drops every record, pending request, and subscriber.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.listeners.clear();
        let mut state = self.lock();
        state.records.clear();
        state.pending.clear();
        debug!("history store disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self) -> Result<(), HistoryError> {
        if self.is_disposed() {
            Err(HistoryError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Records a finished execution at the front. A record with the same id
    /// is replaced. Past `max_items` the oldest records are evicted.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NotTerminal`] for a record that is still running or
    /// waiting, [`HistoryError::Disposed`] after disposal.
    pub fn add(&self, record: ExecutionRecord) -> Result<(), HistoryError> {
        self.ensure_live()?;
        if !record.is_terminal() {
            return Err(HistoryError::NotTerminal {
                id: record.id,
                status: record.status,
            });
        }

        let id = record.id;
        let evicted = {
            let mut state = self.lock();
            state.records.retain(|r| r.id != id);
            state.records.push_front(record);
            let mut evicted = Vec::new();
            if let Some(max) = self.inner.max_items {
                while state.records.len() > max {
                    if let Some(old) = state.records.pop_back() {
                        evicted.push(old.id);
                    }
                }
            }
            evicted
        };

        debug!(execution = %id, "execution recorded");
        self.inner.listeners.emit(&HistoryChange::Added { id });
        if !evicted.is_empty() {
            self.inner
                .listeners
                .emit(&HistoryChange::Evicted { ids: evicted });
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: ExecutionId) -> Option<ExecutionRecord> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    /// Returns matching records, most recent first.
    #[must_use]
    pub fn list(&self, filter: &HistoryFilter) -> Vec<ExecutionRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn issue(&self, target: DeletionTarget, affected: usize) -> DeletionRequest {
        let mut state = self.lock();
        let token = state.next_token;
        state.next_token += 1;
        state.pending.insert(token, target);
        DeletionRequest {
            token,
            target,
            affected,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// First step of deleting one record.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NotFound`] if no record has this id.
    pub fn request_delete(&self, id: ExecutionId) -> Result<DeletionRequest, HistoryError> {
        self.ensure_live()?;
        if self.get(id).is_none() {
            return Err(HistoryError::NotFound { id });
        }
        Ok(self.issue(DeletionTarget::Record(id), 1))
    }

    /// First step of clearing the history.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Disposed`] after disposal.
    pub fn request_clear(&self) -> Result<DeletionRequest, HistoryError> {
        self.ensure_live()?;
        let affected = self.len();
        Ok(self.issue(DeletionTarget::All, affected))
    }

    /// Abandons a pending request.
    pub fn cancel_request(&self, request: DeletionRequest) {
        self.lock().pending.remove(&request.token);
    }

    /// Number of requests awaiting confirmation.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.lock().pending.len()
    }

    fn take_pending(&self, request: &DeletionRequest) -> Result<DeletionTarget, HistoryError> {
        match self.lock().pending.remove(&request.token) {
            Some(target) if target == request.target => Ok(target),
            _ => Err(HistoryError::StaleRequest),
        }
    }

    /// Second step of deleting one record. Returns the removed record.
    ///
    /// # Errors
    ///
    /// [`HistoryError::StaleRequest`] if the request is not pending or is a
    /// clear request; [`HistoryError::NotFound`] if the record vanished in
    /// the meantime.
    pub fn confirm_delete(&self, request: DeletionRequest) -> Result<ExecutionRecord, HistoryError> {
        self.ensure_live()?;
        let DeletionTarget::Record(id) = self.take_pending(&request)? else {
            return Err(HistoryError::StaleRequest);
        };

        let removed = {
            let mut state = self.lock();
            let position = state
                .records
                .iter()
                .position(|r| r.id == id)
                .ok_or(HistoryError::NotFound { id })?;
            state.records.remove(position)
        }
        .ok_or(HistoryError::NotFound { id })?;

        info!(execution = %id, "execution deleted from history");
        self.inner.listeners.emit(&HistoryChange::Deleted { id });
        Ok(removed)
    }

    /// Second step of clearing the history. Returns the number of records
    /// removed.
    ///
    /// # Errors
    ///
    /// [`HistoryError::StaleRequest`] if the request is not a pending clear.
    pub fn confirm_clear(&self, request: DeletionRequest) -> Result<usize, HistoryError> {
        self.ensure_live()?;
        if self.take_pending(&request)? != DeletionTarget::All {
            return Err(HistoryError::StaleRequest);
        }

        let count = {
            let mut state = self.lock();
            let count = state.records.len();
            state.records.clear();
            count
        };

        info!(count, "execution history cleared");
        self.inner.listeners.emit(&HistoryChange::Cleared { count });
        Ok(count)
    }

    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let state = self.lock();
        let mut stats = HistoryStats {
            total: state.records.len(),
            ..HistoryStats::default()
        };
        let mut durations = Vec::new();
        for record in &state.records {
            match record.status {
                ExecutionStatus::Success => stats.success += 1,
                ExecutionStatus::Error => stats.error += 1,
                ExecutionStatus::Cancelled => stats.cancelled += 1,
                ExecutionStatus::Running | ExecutionStatus::Waiting => {}
            }
            if let Some(duration) = record.duration() {
                durations.push(duration.num_milliseconds() as f64);
            }
        }
        if !durations.is_empty() {
            stats.average_duration_ms =
                Some(durations.iter().sum::<f64>() / durations.len() as f64);
        }
        stats
    }

    /// Serializes one record as pretty JSON.
    ///
    /// # Errors
    ///
    /// [`HistoryError::NotFound`] or [`HistoryError::Serialization`].
    pub fn export_json(&self, id: ExecutionId) -> Result<String, HistoryError> {
        let record = self.get(id).ok_or(HistoryError::NotFound { id })?;
        serde_json::to_string_pretty(&record).map_err(|e| HistoryError::Serialization {
            details: e.to_string(),
        })
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&HistoryChange) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("max_items", &self.inner.max_items)
            .field("len", &self.len())
            .finish()
    }
}
