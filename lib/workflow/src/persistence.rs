//! Workflow persistence.
//!
//! The editor reaches storage only through the [`WorkflowStore`] trait.
//! Two implementations ship with the crate: [`InMemoryWorkflowStore`] for
//! tests and ephemeral sessions, and [`JsonFileWorkflowStore`] which keeps
//! one pretty-printed JSON file per workflow under a directory.

use crate::definition::{Workflow, WorkflowSummary};
use crate::error::StoreError;
use async_trait::async_trait;
use flowcanvas_core::WorkflowId;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Result of a [`WorkflowStore`] operation.
pub type StoreResult<T> = flowcanvas_core::Result<T, StoreError>;

/// Output format for [`WorkflowStore::export_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Single-line JSON.
    Json,
    /// Indented JSON.
    #[default]
    JsonPretty,
}

/// Serializes a workflow in the given format.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if serialization fails.
pub fn export_workflow(workflow: &Workflow, format: ExportFormat) -> Result<String, StoreError> {
    let result = match format {
        ExportFormat::Json => serde_json::to_string(workflow),
        ExportFormat::JsonPretty => serde_json::to_string_pretty(workflow),
    };
    result.map_err(|e| StoreError::Serialization {
        details: e.to_string(),
    })
}

/// Parses a workflow, re-checking every graph invariant.
///
/// # Errors
///
/// Returns [`StoreError::InvalidFormat`] if the data is not a well-formed
/// workflow.
pub fn import_workflow(data: &str) -> Result<Workflow, StoreError> {
    serde_json::from_str(data).map_err(|e| StoreError::InvalidFormat {
        details: e.to_string(),
    })
}

/// Trait for workflow storage.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Inserts or replaces a workflow.
    async fn save(&self, workflow: &Workflow) -> StoreResult<()>;

    /// Loads a workflow by ID.
    async fn load(&self, id: WorkflowId) -> StoreResult<Workflow>;

    /// Lists all workflows, most recently updated first.
    async fn list(&self) -> StoreResult<Vec<WorkflowSummary>>;

    /// Deletes a workflow.
    async fn delete(&self, id: WorkflowId) -> StoreResult<()>;

    /// Stores a copy of a workflow under a fresh ID and returns it.
    async fn duplicate(&self, id: WorkflowId) -> StoreResult<Workflow> {
        let copy = self.load(id).await?.duplicate();
        self.save(&copy).await?;
        Ok(copy)
    }

    /// Parses a serialized workflow and stores it under a fresh ID.
    async fn import_from(&self, data: &str) -> StoreResult<Workflow> {
        let mut workflow = import_workflow(data)?;
        workflow.id = WorkflowId::new();
        workflow.touch();
        self.save(&workflow).await?;
        Ok(workflow)
    }

    /// Serializes a stored workflow.
    async fn export_to(
        &self,
        id: WorkflowId,
        format: ExportFormat,
    ) -> StoreResult<String> {
        let workflow = self.load(id).await?;
        Ok(export_workflow(&workflow, format)?)
    }
}

fn sort_summaries(summaries: &mut [WorkflowSummary]) {
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// In-memory workflow store.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn save(&self, workflow: &Workflow) -> StoreResult<()> {
        self.workflows
            .write()
            .await
            .insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn load(&self, id: WorkflowId) -> StoreResult<Workflow> {
        self.workflows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { workflow_id: id }.into())
    }

    async fn list(&self) -> StoreResult<Vec<WorkflowSummary>> {
        let mut summaries: Vec<_> = self
            .workflows
            .read()
            .await
            .values()
            .map(WorkflowSummary::from)
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, id: WorkflowId) -> StoreResult<()> {
        match self.workflows.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { workflow_id: id }.into()),
        }
    }
}

/// Directory-backed workflow store, one `<id>.json` file per workflow.
#[derive(Debug, Clone)]
pub struct JsonFileWorkflowStore {
    dir: PathBuf,
}

impl JsonFileWorkflowStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: WorkflowId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

fn io_error(err: &std::io::Error) -> StoreError {
    StoreError::Io {
        details: err.to_string(),
    }
}

#[async_trait]
impl WorkflowStore for JsonFileWorkflowStore {
    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.id))]
    async fn save(&self, workflow: &Workflow) -> StoreResult<()> {
        let data = export_workflow(workflow, ExportFormat::JsonPretty)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&e))?;

        // Write then rename so a crash never leaves a truncated file.
        let path = self.path_for(workflow.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| io_error(&e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&e))?;

        debug!(path = %path.display(), "workflow saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, id: WorkflowId) -> StoreResult<Workflow> {
        let data = tokio::fs::read_to_string(self.path_for(id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound { workflow_id: id },
                _ => io_error(&e),
            })?;
        Ok(import_workflow(&data)?)
    }

    async fn list(&self) -> StoreResult<Vec<WorkflowSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&e).into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| io_error(&e))?;
            match import_workflow(&data) {
                Ok(workflow) => summaries.push(WorkflowSummary::from(&workflow)),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable workflow file"),
            }
        }
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: WorkflowId) -> StoreResult<()> {
        tokio::fs::remove_file(self.path_for(id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound { workflow_id: id },
                _ => io_error(&e),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::PortRef;
    use crate::node::Point;
    use crate::registry::BuiltinNodeTypes;

    fn sample() -> Workflow {
        let registry = BuiltinNodeTypes::default();
        let mut workflow = Workflow::new("Sample");
        let hook = workflow
            .graph
            .add_node(&registry, "webhook", Point::ZERO)
            .unwrap();
        let http = workflow
            .graph
            .add_node(&registry, "http", Point::new(250.0, 0.0))
            .unwrap();
        workflow
            .graph
            .add_connection(PortRef::new(hook.id, "trigger"), PortRef::new(http.id, "input"))
            .unwrap();
        workflow
    }

    #[test]
    fn import_rejects_garbage() {
        assert!(matches!(
            import_workflow("{ not json"),
            Err(StoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn export_then_import_preserves_graph() {
        let workflow = sample();
        let data = export_workflow(&workflow, ExportFormat::Json).unwrap();
        assert!(!data.contains('\n'));
        assert_eq!(import_workflow(&data).unwrap(), workflow);
    }

    #[tokio::test]
    async fn in_memory_crud() {
        let store = InMemoryWorkflowStore::new();
        let workflow = sample();
        store.save(&workflow).await.unwrap();

        assert_eq!(store.load(workflow.id).await.unwrap(), workflow);
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].node_count, 2);

        store.delete(workflow.id).await.unwrap();
        let err = store.load(workflow.id).await.unwrap_err();
        assert!(err.to_string().contains("workflow not found"));
    }

    #[tokio::test]
    async fn duplicate_and_import_use_fresh_ids() {
        let store = InMemoryWorkflowStore::new();
        let workflow = sample();
        store.save(&workflow).await.unwrap();

        let copy = store.duplicate(workflow.id).await.unwrap();
        assert_ne!(copy.id, workflow.id);

        let exported = store
            .export_to(workflow.id, ExportFormat::JsonPretty)
            .await
            .unwrap();
        let imported = store.import_from(&exported).await.unwrap();
        assert_ne!(imported.id, workflow.id);
        assert_eq!(imported.graph, workflow.graph);
        assert_eq!(store.list().await.unwrap().len(), 3);
    }
}
