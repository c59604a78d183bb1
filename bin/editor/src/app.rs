//! Editor composition root.
//!
//! [`EditorApp`] wires one graph to its canvas engine, the log and history
//! stores, and a simulator. It owns the stores' lifecycle: they are created
//! by [`EditorApp::init`] and torn down by [`EditorApp::dispose`].

use crate::config::EditorConfig;
use flowcanvas_canvas::CanvasEngine;
use flowcanvas_core::SubscriptionId;
use flowcanvas_execution::{Clock, ExecutionRequest, RandomSource, Simulator, SimulatorError};
use flowcanvas_store::{HistoryStore, LogStore, NewLogEntry};
use flowcanvas_workflow::{
    CommandOutcome, ExecutionRecord, GraphChange, GraphError, GraphHandle, NodeTypeRegistry,
    Point, PortRef, Workflow, WorkflowGraph,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const EDITOR_CATEGORY: &str = "editor";

pub struct EditorApp {
    workflow: Workflow,
    graph: GraphHandle,
    canvas: CanvasEngine,
    logs: LogStore,
    history: HistoryStore,
    simulator: Simulator,
    graph_subscription: SubscriptionId,
}

impl EditorApp {
    /// Builds every service for `workflow`. The workflow's graph moves into a
    /// shared [`GraphHandle`]; [`workflow`](Self::workflow) reassembles it.
    #[must_use]
    pub fn init(
        config: &EditorConfig,
        workflow: Workflow,
        registry: Arc<dyn NodeTypeRegistry>,
    ) -> Self {
        let logs = LogStore::init(config.logs.clone());
        let history = HistoryStore::init(config.history.clone());
        let graph = GraphHandle::new(workflow.graph.clone(), registry);
        let canvas = CanvasEngine::new(graph.clone(), config.canvas.clone());
        let simulator = Simulator::new(
            graph.clone(),
            logs.clone(),
            history.clone(),
            config.simulator.clone(),
        );

        let sink = logs.clone();
        let graph_subscription = graph.subscribe(move |change| log_graph_change(&sink, change));

        debug!(workflow = %workflow.id, nodes = workflow.graph.node_count(), "editor initialized");
        Self {
            workflow,
            graph,
            canvas,
            logs,
            history,
            simulator,
            graph_subscription,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    #[must_use]
    pub fn canvas(&self) -> &CanvasEngine {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasEngine {
        &mut self.canvas
    }

    #[must_use]
    pub fn logs(&self) -> &LogStore {
        &self.logs
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    #[must_use]
    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.simulator = self.simulator.clone().with_clock(clock);
    }

    pub fn set_random(&mut self, random: Arc<dyn RandomSource>) {
        self.simulator = self.simulator.clone().with_random(random);
    }

    /// The workflow with its current graph.
    #[must_use]
    pub fn workflow(&self) -> Workflow {
        let mut workflow = self.workflow.clone();
        workflow.graph = self.graph.snapshot();
        workflow
    }

    /// Runs the current graph once.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::AlreadyRunning`] if a run is in flight.
    pub async fn run(
        &self,
        cancel: CancellationToken,
    ) -> flowcanvas_core::Result<ExecutionRecord, SimulatorError> {
        let request = ExecutionRequest::for_workflow(&self.workflow).triggered_by("editor");
        self.simulator.execute(request, cancel).await
    }

    /// Retries a previous run.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::AlreadyRunning`] if a run is in flight.
    pub async fn retry(
        &self,
        previous: &ExecutionRecord,
        cancel: CancellationToken,
    ) -> flowcanvas_core::Result<ExecutionRecord, SimulatorError> {
        self.simulator.retry(previous, cancel).await
    }

    /// Tears down subscriptions and both stores.
    pub fn dispose(self) {
        self.graph.unsubscribe(self.graph_subscription);
        self.logs.dispose();
        self.history.dispose();
        debug!(workflow = %self.workflow.id, "editor disposed");
    }
}

fn log_graph_change(logs: &LogStore, change: &GraphChange) {
    let message = match &change.outcome {
        CommandOutcome::NodeAdded(node) => format!("Added node {}", node.name),
        CommandOutcome::NodeDeleted(deleted) => format!(
            "Deleted node {} and {} connection(s)",
            deleted.node.name,
            deleted.connections.len()
        ),
        CommandOutcome::ConnectionAdded(c) => format!(
            "Connected {}.{} to {}.{}",
            c.source_node_id, c.source_port_id, c.target_node_id, c.target_port_id
        ),
        CommandOutcome::ConnectionDeleted(c) => format!("Removed connection {}", c.id),
        CommandOutcome::GraphReplaced => "Replaced graph".to_owned(),
        CommandOutcome::NodeMoved { .. }
        | CommandOutcome::NodeUpdated { .. }
        | CommandOutcome::StatusesReset => return,
    };
    logs.add_log(
        NewLogEntry::debug(EDITOR_CATEGORY, message)
            .with_details(serde_json::json!({ "revision": change.revision })),
    );
}

/// A webhook feeding an HTTP request whose response goes through a code
/// step.
///
/// # Errors
///
/// Returns a [`GraphError`] if the registry lacks any of the three types.
pub fn demo_workflow(registry: &dyn NodeTypeRegistry) -> Result<Workflow, GraphError> {
    let mut graph = WorkflowGraph::new();
    let hook = graph.add_node(registry, "webhook", Point::new(100.0, 200.0))?;
    let http = graph.add_node(registry, "http", Point::new(400.0, 200.0))?;
    let code = graph.add_node(registry, "code", Point::new(700.0, 200.0))?;
    graph.add_connection(
        PortRef::new(hook.id, "trigger"),
        PortRef::new(http.id, "input"),
    )?;
    graph.add_connection(PortRef::new(http.id, "output"), PortRef::new(code.id, "input"))?;
    Ok(Workflow::with_graph("Demo workflow", graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcanvas_store::{LogFilter, LogLevel};
    use flowcanvas_workflow::{BuiltinNodeTypes, GraphCommand};

    fn app() -> EditorApp {
        let registry = Arc::new(BuiltinNodeTypes::default());
        let workflow = demo_workflow(registry.as_ref()).unwrap();
        EditorApp::init(&EditorConfig::default(), workflow, registry)
    }

    #[test]
    fn demo_workflow_is_valid() {
        let workflow = demo_workflow(&BuiltinNodeTypes::default()).unwrap();
        assert!(workflow.validate().is_ok());
        assert_eq!(workflow.graph.node_count(), 3);
        assert_eq!(workflow.graph.connection_count(), 2);
    }

    #[test]
    fn graph_edits_are_logged() {
        let app = app();
        app.graph()
            .dispatch(GraphCommand::AddNode {
                node_type: "gmail".to_owned(),
                position: Point::ZERO,
            })
            .unwrap();
        let editor = app
            .logs()
            .get_logs(&LogFilter::default().category(EDITOR_CATEGORY));
        assert_eq!(editor.len(), 1);
        assert_eq!(editor[0].level, LogLevel::Debug);
        assert_eq!(app.workflow().graph.node_count(), 4);
    }

    #[test]
    fn dispose_stops_logging() {
        let app = app();
        let graph = app.graph().clone();
        let logs = app.logs().clone();
        app.dispose();
        graph.dispatch(GraphCommand::ResetStatuses).unwrap();
        graph
            .dispatch(GraphCommand::AddNode {
                node_type: "manual".to_owned(),
                position: Point::ZERO,
            })
            .unwrap();
        assert!(logs.is_empty());
        assert!(logs.is_disposed());
    }
}
