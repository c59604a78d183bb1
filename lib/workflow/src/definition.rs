//! Workflow definition types.
//!
//! A workflow is the persistence unit of the editor:
//! - Metadata (name, description, tags, active flag, timestamps)
//! - The graph of nodes and connections

use crate::graph::WorkflowGraph;
use chrono::{DateTime, Utc};
use flowcanvas_core::WorkflowId;
use serde::{Deserialize, Serialize};

/// Metadata for a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    /// Human-readable name for this workflow.
    pub name: String,
    /// Description of what this workflow does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for organization/filtering.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether this workflow reacts to its triggers.
    #[serde(default)]
    pub active: bool,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowMetadata {
    /// Creates inactive metadata stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            tags: Vec::new(),
            active: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A complete workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
    /// The workflow graph (nodes and connections).
    #[serde(default)]
    pub graph: WorkflowGraph,
}

impl Workflow {
    /// Creates an empty workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_graph(name, WorkflowGraph::new())
    }

    /// Creates a workflow around an existing graph.
    #[must_use]
    pub fn with_graph(name: impl Into<String>, graph: WorkflowGraph) -> Self {
        Self {
            id: WorkflowId::new(),
            metadata: WorkflowMetadata::new(name),
            graph,
        }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns whether the workflow is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.metadata.active
    }

    /// Activates or deactivates the workflow.
    pub fn set_active(&mut self, active: bool) {
        self.metadata.active = active;
        self.touch();
    }

    /// Validates the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow graph is invalid.
    pub fn validate(&self) -> Result<(), crate::error::GraphError> {
        self.graph.validate()
    }

    /// Marks the workflow as updated (bumps `updated_at`).
    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    /// Returns a copy with a fresh ID, " (copy)" appended to the name,
    /// inactive, and new timestamps.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        let now = Utc::now();
        copy.id = WorkflowId::new();
        copy.metadata.name = format!("{} (copy)", self.metadata.name);
        copy.metadata.active = false;
        copy.metadata.created_at = now;
        copy.metadata.updated_at = now;
        copy
    }
}

/// Summary information about a workflow (for listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
    pub tags: Vec<String>,
    /// Number of nodes in the graph.
    pub node_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id,
            name: workflow.metadata.name.clone(),
            description: workflow.metadata.description.clone(),
            active: workflow.metadata.active,
            tags: workflow.metadata.tags.clone(),
            node_count: workflow.graph.node_count(),
            updated_at: workflow.metadata.updated_at,
        }
    }
}
