//! Execution records and events.
//!
//! An [`ExecutionRecord`] is created in `running` state when a simulated run
//! starts, mutated in place while nodes run, and frozen into the execution
//! history once it reaches a terminal status. Timestamps are supplied by the
//! caller so that runs driven by a virtual clock stay deterministic.

use chrono::{DateTime, Utc};
use flowcanvas_core::{ExecutionId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// The overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Nodes are being executed.
    Running,
    /// Every node completed or was skipped.
    Success,
    /// A node failed or the run could not continue.
    Error,
    /// The run was cancelled.
    Cancelled,
    /// The run is parked (for example waiting on a trigger).
    Waiting,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Waiting => write!(f, "waiting"),
        }
    }
}

/// How a run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Started from the editor's execute button.
    #[default]
    Manual,
    /// Started by a schedule or other trigger.
    Trigger,
    /// Started by an incoming webhook.
    Webhook,
    /// Re-run of an earlier execution.
    Retry,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Trigger => write!(f, "trigger"),
            Self::Webhook => write!(f, "webhook"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

/// The status of a single node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeExecutionStatus {
    Running,
    Success,
    Error,
    /// Node was disabled and not executed.
    Skipped,
    /// Run was cancelled while this node was running.
    Cancelled,
}

impl NodeExecutionStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Execution record for a single node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionRecord {
    /// The node that was executed.
    pub node_id: NodeId,
    /// Node name at the time of execution.
    pub node_name: String,
    pub status: NodeExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Outputs of upstream nodes keyed by target port id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeExecutionRecord {
    /// Creates a running record.
    #[must_use]
    pub fn start(
        node_id: NodeId,
        node_name: impl Into<String>,
        input_data: Option<JsonValue>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id,
            node_name: node_name.into(),
            status: NodeExecutionStatus::Running,
            start_time: Some(now),
            end_time: None,
            input_data,
            output_data: None,
            error: None,
        }
    }

    /// Creates a record for a node that was not executed.
    #[must_use]
    pub fn skipped(node_id: NodeId, node_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            node_id,
            node_name: node_name.into(),
            status: NodeExecutionStatus::Skipped,
            start_time: None,
            end_time: Some(now),
            input_data: None,
            output_data: None,
            error: None,
        }
    }

    /// Marks the node as completed.
    pub fn complete(&mut self, output: JsonValue, now: DateTime<Utc>) {
        self.status = NodeExecutionStatus::Success;
        self.end_time = Some(now);
        self.output_data = Some(output);
    }

    /// Marks the node as failed.
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = NodeExecutionStatus::Error;
        self.end_time = Some(now);
        self.error = Some(error.into());
    }

    /// Marks the node as cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = NodeExecutionStatus::Cancelled;
        self.end_time = Some(now);
    }

    /// Returns the execution time in milliseconds, if finished.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        Some((self.end_time? - self.start_time?).num_milliseconds())
    }
}

/// The full status and result snapshot of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub mode: ExecutionMode,
    /// Who or what started the run (a user name, a trigger description).
    pub triggered_by: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Per-node records in execution order.
    pub node_executions: Vec<NodeExecutionRecord>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Creates a running record with a fresh ID.
    #[must_use]
    pub fn new(
        workflow_id: WorkflowId,
        workflow_name: impl Into<String>,
        mode: ExecutionMode,
        triggered_by: impl Into<String>,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            workflow_id,
            workflow_name: workflow_name.into(),
            mode,
            triggered_by: triggered_by.into(),
            status: ExecutionStatus::Running,
            start_time: now,
            end_time: None,
            node_executions: Vec::new(),
            retry_count: 0,
            max_retries,
            error: None,
        }
    }

    /// Sets the retry count.
    #[must_use]
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Marks the run as successful.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = ExecutionStatus::Success;
        self.end_time = Some(now);
    }

    /// Marks the run as failed.
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = ExecutionStatus::Error;
        self.end_time = Some(now);
        self.error = Some(error.into());
    }

    /// Marks the run as cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = ExecutionStatus::Cancelled;
        self.end_time = Some(now);
    }

    /// Returns true once the run has a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the record for `node_id`, if it was reached.
    #[must_use]
    pub fn node_execution(&self, node_id: NodeId) -> Option<&NodeExecutionRecord> {
        self.node_executions.iter().find(|n| n.node_id == node_id)
    }

    /// Returns the duration of the run, if it has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end_time? - self.start_time)
    }

    /// Returns true if a retry of this run would exceed `max_retries`.
    #[must_use]
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Structured progress notifications published by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        mode: ExecutionMode,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        output: JsonValue,
        duration_ms: i64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        execution_id: ExecutionId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeSkipped {
        execution_id: ExecutionId,
        node_id: NodeId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        timestamp: DateTime<Utc>,
    },
    RunFailed {
        execution_id: ExecutionId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    RunCancelled {
        execution_id: ExecutionId,
        timestamp: DateTime<Utc>,
    },
    /// Node statuses were returned to idle after the settle delay.
    StatusesReset {
        execution_id: ExecutionId,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    /// Returns the execution ID associated with this event.
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            Self::RunStarted { execution_id, .. }
            | Self::NodeStarted { execution_id, .. }
            | Self::NodeCompleted { execution_id, .. }
            | Self::NodeFailed { execution_id, .. }
            | Self::NodeSkipped { execution_id, .. }
            | Self::RunCompleted { execution_id, .. }
            | Self::RunFailed { execution_id, .. }
            | Self::RunCancelled { execution_id, .. }
            | Self::StatusesReset { execution_id, .. } => *execution_id,
        }
    }

    /// Returns the timestamp of this event.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RunStarted { timestamp, .. }
            | Self::NodeStarted { timestamp, .. }
            | Self::NodeCompleted { timestamp, .. }
            | Self::NodeFailed { timestamp, .. }
            | Self::NodeSkipped { timestamp, .. }
            | Self::RunCompleted { timestamp, .. }
            | Self::RunFailed { timestamp, .. }
            | Self::RunCancelled { timestamp, .. }
            | Self::StatusesReset { timestamp, .. } => *timestamp,
        }
    }
}
