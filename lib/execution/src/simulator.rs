//! Simulated workflow execution.
//!
//! The simulator walks the graph one node at a time, drives node statuses
//! through the graph handle, writes progress to the log store, and files the
//! finished record in the history store. Nothing is actually called: each
//! node waits a random delay and produces the mock output of its type.

use crate::clock::{Clock, TokioClock};
use crate::config::SimulatorConfig;
use crate::error::SimulatorError;
use crate::random::{RandomSource, ThreadRandom};
use crate::strategy::ExecutionOrderStrategy;
use flowcanvas_core::{Emitter, NodeId, SubscriptionId, WorkflowId};
use flowcanvas_store::{HistoryStore, LogStore, NewLogEntry};
use flowcanvas_workflow::{
    ExecutionEvent, ExecutionMode, ExecutionRecord, GraphCommand, GraphHandle, Node,
    NodeExecutionRecord, NodeStatus, Workflow, WorkflowGraph,
};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const WORKFLOW_CATEGORY: &str = "workflow";
const NODE_CATEGORY: &str = "node";

/// What to run and how to label it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub mode: ExecutionMode,
    pub triggered_by: String,
    pub retry_count: u32,
    /// Overrides the configured retry budget.
    pub max_retries: Option<u32>,
}

impl ExecutionRequest {
    /// A manual run of `workflow`.
    #[must_use]
    pub fn for_workflow(workflow: &Workflow) -> Self {
        Self {
            workflow_id: workflow.id,
            workflow_name: workflow.name().to_owned(),
            mode: ExecutionMode::Manual,
            triggered_by: "manual".to_owned(),
            retry_count: 0,
            max_retries: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn triggered_by(mut self, trigger: impl Into<String>) -> Self {
        self.triggered_by = trigger.into();
        self
    }
}

enum WalkOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Clears the running flag when dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs simulated executions against one graph.
///
/// Clones share the running flag and event subscribers, so at most one run
/// is in flight across all of them.
#[derive(Clone)]
pub struct Simulator {
    graph: GraphHandle,
    logs: LogStore,
    history: HistoryStore,
    config: SimulatorConfig,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    strategy: Arc<dyn ExecutionOrderStrategy>,
    events: Arc<Emitter<ExecutionEvent>>,
    running: Arc<AtomicBool>,
}

impl Simulator {
    /// Creates a simulator with real time, thread randomness, and the
    /// configured order strategy.
    #[must_use]
    pub fn new(
        graph: GraphHandle,
        logs: LogStore,
        history: HistoryStore,
        config: SimulatorConfig,
    ) -> Self {
        let strategy = config.order.strategy();
        Self {
            graph,
            logs,
            history,
            config,
            clock: Arc::new(TokioClock),
            random: Arc::new(ThreadRandom),
            strategy,
            events: Arc::new(Emitter::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn ExecutionOrderStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    #[must_use]
    pub fn strategy(&self) -> &Arc<dyn ExecutionOrderStrategy> {
        &self.strategy
    }

    /// Returns true while a run, including its settle delay, is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn log(&self, entry: NewLogEntry) {
        self.logs.add_log(entry);
    }

    fn set_status(&self, node_id: NodeId, status: NodeStatus) {
        if let Err(err) = self
            .graph
            .dispatch(GraphCommand::SetNodeStatus { node_id, status })
        {
            debug!(node = %node_id, error = %err, "could not update node status");
        }
    }

    /// Runs the whole graph once and returns the terminal record.
    ///
    /// Node failures, removed nodes, and cancellation produce an `error` or
    /// `cancelled` record rather than an `Err`. The record is filed in the
    /// history store before the settle delay; the future resolves after
    /// node statuses have been reset.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::AlreadyRunning`] if another run is in flight.
    #[instrument(skip_all, fields(workflow = %request.workflow_name, mode = %request.mode))]
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        cancel: CancellationToken,
    ) -> flowcanvas_core::Result<ExecutionRecord, SimulatorError> {
        let Some(_running) = RunningGuard::acquire(&self.running) else {
            return Err(SimulatorError::AlreadyRunning.into());
        };

        let mut record = ExecutionRecord::new(
            request.workflow_id,
            request.workflow_name,
            request.mode,
            request.triggered_by,
            request.max_retries.unwrap_or(self.config.max_retries),
            self.clock.now(),
        )
        .with_retry_count(request.retry_count);
        let execution_id = record.id;

        info!(execution = %execution_id, strategy = self.strategy.name(), "execution started");
        self.log(
            NewLogEntry::info(
                WORKFLOW_CATEGORY,
                format!("Starting workflow execution: {}", record.workflow_name),
            )
            .with_execution(execution_id)
            .with_details(json!({ "mode": record.mode, "triggeredBy": record.triggered_by })),
        );
        self.events.emit(&ExecutionEvent::RunStarted {
            execution_id,
            workflow_id: record.workflow_id,
            mode: record.mode,
            timestamp: record.start_time,
        });

        let outcome = self.walk(&mut record, &cancel).await;
        let now = self.clock.now();
        let cancelled = matches!(outcome, WalkOutcome::Cancelled);
        match outcome {
            WalkOutcome::Completed => {
                record.complete(now);
                let duration_ms = record.duration().map(|d| d.num_milliseconds());
                info!(execution = %execution_id, ?duration_ms, "execution succeeded");
                self.log(
                    NewLogEntry::success(WORKFLOW_CATEGORY, "Workflow execution completed successfully")
                        .with_execution(execution_id)
                        .with_details(json!({
                            "durationMs": duration_ms,
                            "nodesExecuted": record.node_executions.len(),
                        })),
                );
                self.events
                    .emit(&ExecutionEvent::RunCompleted { execution_id, timestamp: now });
            }
            WalkOutcome::Failed(error) => {
                warn!(execution = %execution_id, %error, "execution failed");
                self.log(
                    NewLogEntry::error(
                        WORKFLOW_CATEGORY,
                        format!("Workflow execution failed: {error}"),
                    )
                    .with_execution(execution_id),
                );
                self.events.emit(&ExecutionEvent::RunFailed {
                    execution_id,
                    error: error.clone(),
                    timestamp: now,
                });
                record.fail(error, now);
            }
            WalkOutcome::Cancelled => {
                record.cancel(now);
                info!(execution = %execution_id, "execution cancelled");
                self.log(
                    NewLogEntry::warning(WORKFLOW_CATEGORY, "Workflow execution cancelled")
                        .with_execution(execution_id),
                );
                self.events
                    .emit(&ExecutionEvent::RunCancelled { execution_id, timestamp: now });
            }
        }

        if let Err(err) = self.history.add(record.clone()) {
            warn!(execution = %execution_id, error = %err, "execution not recorded in history");
        }

        if !cancelled {
            tokio::select! {
                () = self.clock.sleep(self.config.settle_delay()) => {}
                () = cancel.cancelled() => {}
            }
        }
        if let Err(err) = self.graph.dispatch(GraphCommand::ResetStatuses) {
            debug!(error = %err, "could not reset node statuses");
        }
        self.events.emit(&ExecutionEvent::StatusesReset {
            execution_id,
            timestamp: self.clock.now(),
        });

        Ok(record)
    }

    /// Re-runs the graph for a previous execution with `mode = retry` and an
    /// incremented retry count. Exceeding the retry budget is logged but not
    /// refused.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::AlreadyRunning`] if another run is in flight.
    pub async fn retry(
        &self,
        previous: &ExecutionRecord,
        cancel: CancellationToken,
    ) -> flowcanvas_core::Result<ExecutionRecord, SimulatorError> {
        let retry_count = previous.retry_count + 1;
        if previous.retries_exhausted() {
            warn!(execution = %previous.id, retry_count, "retry budget exceeded");
            self.log(
                NewLogEntry::warning(
                    WORKFLOW_CATEGORY,
                    format!(
                        "Retry {retry_count} exceeds the limit of {}",
                        previous.max_retries
                    ),
                )
                .with_execution(previous.id),
            );
        }

        let request = ExecutionRequest {
            workflow_id: previous.workflow_id,
            workflow_name: previous.workflow_name.clone(),
            mode: ExecutionMode::Retry,
            triggered_by: previous.triggered_by.clone(),
            retry_count,
            max_retries: Some(previous.max_retries),
        };
        self.execute(request, cancel).await
    }

    async fn walk(&self, record: &mut ExecutionRecord, cancel: &CancellationToken) -> WalkOutcome {
        let execution_id = record.id;
        let order = match self.graph.read(|g| self.strategy.order(g)) {
            Ok(order) => order,
            Err(err) => {
                let all: Vec<NodeId> = self.graph.read(|g| g.nodes().iter().map(|n| n.id).collect());
                self.fail_remaining(&all);
                return WalkOutcome::Failed(format!("cannot order nodes: {err}"));
            }
        };
        let (min_delay, max_delay) = self.config.node_delay_range();
        let mut outputs: HashMap<NodeId, JsonValue> = HashMap::new();

        for (index, &node_id) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                return WalkOutcome::Cancelled;
            }

            let Some(node) = self.graph.read(|g| g.node(node_id).cloned()) else {
                let error = format!("node {node_id} was removed during execution");
                self.fail_remaining(&order[index..]);
                return WalkOutcome::Failed(error);
            };

            if node.disabled {
                self.skip(record, &node);
                continue;
            }

            let input = self.graph.read(|g| collect_inputs(g, node_id, &outputs));
            let started = self.clock.now();
            let mut node_record =
                NodeExecutionRecord::start(node.id, node.name.clone(), input, started);

            self.set_status(node_id, NodeStatus::Running);
            self.log(
                NewLogEntry::info(NODE_CATEGORY, format!("Executing node: {}", node.name))
                    .with_node(node_id)
                    .with_execution(execution_id),
            );
            self.events.emit(&ExecutionEvent::NodeStarted {
                execution_id,
                node_id,
                timestamp: started,
            });

            let delay = self.random.delay_between(min_delay, max_delay);
            let interrupted = tokio::select! {
                () = self.clock.sleep(delay) => false,
                () = cancel.cancelled() => true,
            };
            if interrupted {
                node_record.cancel(self.clock.now());
                record.node_executions.push(node_record);
                return WalkOutcome::Cancelled;
            }

            let output = match self.run_node(&node) {
                Ok(output) => output,
                Err(error) => {
                    let now = self.clock.now();
                    node_record.fail(error.clone(), now);
                    record.node_executions.push(node_record);
                    self.fail_remaining(&order[index..]);
                    self.log(
                        NewLogEntry::error(
                            NODE_CATEGORY,
                            format!("Node failed: {}: {error}", node.name),
                        )
                        .with_node(node_id)
                        .with_execution(execution_id),
                    );
                    self.events.emit(&ExecutionEvent::NodeFailed {
                        execution_id,
                        node_id,
                        error: error.clone(),
                        timestamp: now,
                    });
                    return WalkOutcome::Failed(error);
                }
            };

            let now = self.clock.now();
            node_record.complete(output.clone(), now);
            let duration_ms = node_record.duration_ms().unwrap_or_default();
            self.set_status(node_id, NodeStatus::Success);
            self.log(
                NewLogEntry::success(NODE_CATEGORY, format!("Node completed: {}", node.name))
                    .with_node(node_id)
                    .with_execution(execution_id)
                    .with_details(json!({ "output": output, "durationMs": duration_ms })),
            );
            self.events.emit(&ExecutionEvent::NodeCompleted {
                execution_id,
                node_id,
                output: output.clone(),
                duration_ms,
                timestamp: now,
            });
            outputs.insert(node_id, output);
            record.node_executions.push(node_record);
        }

        WalkOutcome::Completed
    }

    fn run_node(&self, node: &Node) -> Result<JsonValue, String> {
        let Some(definition) = self.graph.registry().definition(&node.node_type) else {
            return Err(format!("unknown node type '{}'", node.node_type));
        };
        if self.random.should_fail(self.config.failure_rate) {
            return Err(format!("simulated failure in {}", node.name));
        }
        Ok(definition.mock_output(node))
    }

    fn skip(&self, record: &mut ExecutionRecord, node: &Node) {
        let now = self.clock.now();
        record
            .node_executions
            .push(NodeExecutionRecord::skipped(node.id, node.name.clone(), now));
        self.log(
            NewLogEntry::debug(NODE_CATEGORY, format!("Skipping disabled node: {}", node.name))
                .with_node(node.id)
                .with_execution(record.id),
        );
        self.events.emit(&ExecutionEvent::NodeSkipped {
            execution_id: record.id,
            node_id: node.id,
            reason: "disabled".to_owned(),
            timestamp: now,
        });
    }

    fn fail_remaining(&self, remaining: &[NodeId]) {
        for &node_id in remaining {
            self.set_status(node_id, NodeStatus::Error);
        }
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("strategy", &self.strategy.name())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Gathers upstream outputs keyed by target port id. Several connections
/// into one port yield an array. `None` if nothing upstream has run.
fn collect_inputs(
    graph: &WorkflowGraph,
    node_id: NodeId,
    outputs: &HashMap<NodeId, JsonValue>,
) -> Option<JsonValue> {
    let mut inputs = Map::new();
    for (source, connection) in graph.predecessors(node_id) {
        let Some(output) = outputs.get(&source.id) else {
            continue;
        };
        match inputs.remove(&connection.target_port_id) {
            None => {
                inputs.insert(connection.target_port_id.clone(), output.clone());
            }
            Some(JsonValue::Array(mut values)) => {
                values.push(output.clone());
                inputs.insert(connection.target_port_id.clone(), JsonValue::Array(values));
            }
            Some(existing) => {
                inputs.insert(
                    connection.target_port_id.clone(),
                    JsonValue::Array(vec![existing, output.clone()]),
                );
            }
        }
    }
    (!inputs.is_empty()).then_some(JsonValue::Object(inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::random::FixedRandom;
    use flowcanvas_store::{HistoryConfig, LogFilter, LogLevel, LogStoreConfig};
    use flowcanvas_workflow::{BuiltinNodeTypes, ExecutionStatus, NodeExecutionStatus, Point, PortRef};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Fixture {
        simulator: Simulator,
        graph: GraphHandle,
        logs: LogStore,
        history: HistoryStore,
        clock: Arc<VirtualClock>,
    }

    fn fixture(random: FixedRandom) -> Fixture {
        let graph = GraphHandle::new(WorkflowGraph::new(), Arc::new(BuiltinNodeTypes::default()));
        let logs = LogStore::init(LogStoreConfig::default());
        let history = HistoryStore::init(HistoryConfig::default());
        let clock = Arc::new(VirtualClock::default());
        let simulator = Simulator::new(
            graph.clone(),
            logs.clone(),
            history.clone(),
            SimulatorConfig::default(),
        )
        .with_clock(clock.clone())
        .with_random(Arc::new(random));
        Fixture {
            simulator,
            graph,
            logs,
            history,
            clock,
        }
    }

    fn add(graph: &GraphHandle, node_type: &str) -> NodeId {
        match graph.dispatch(GraphCommand::AddNode {
            node_type: node_type.to_owned(),
            position: Point::ZERO,
        }) {
            Ok(flowcanvas_workflow::CommandOutcome::NodeAdded(node)) => node.id,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            workflow_id: WorkflowId::new(),
            workflow_name: "Demo".to_owned(),
            mode: ExecutionMode::Manual,
            triggered_by: "test".to_owned(),
            retry_count: 0,
            max_retries: None,
        }
    }

    #[tokio::test]
    async fn visits_nodes_in_collection_order() {
        let f = fixture(FixedRandom::new(Duration::from_millis(1000)));
        let n1 = add(&f.graph, "code");
        let n2 = add(&f.graph, "webhook");
        let n3 = add(&f.graph, "http");
        f.graph
            .dispatch(GraphCommand::AddConnection {
                source: PortRef::new(n2, "trigger"),
                target: PortRef::new(n1, "input"),
            })
            .unwrap();

        let record = f
            .simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();

        let visited: Vec<_> = record.node_executions.iter().map(|n| n.node_id).collect();
        assert_eq!(visited, vec![n1, n2, n3]);
        assert_eq!(record.status, ExecutionStatus::Success);
        assert!(record
            .node_executions
            .iter()
            .all(|n| n.duration_ms() == Some(1000)));
        // Three node delays plus the settle delay.
        assert_eq!(f.clock.elapsed().num_milliseconds(), 5000);
    }

    #[tokio::test]
    async fn statuses_settle_back_to_idle() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        add(&f.graph, "manual");
        add(&f.graph, "code");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        f.graph.subscribe(move |change| sink.lock().unwrap().push(change.outcome.clone()));

        f.simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();

        assert!(f.graph.read(|g| g.nodes().iter().all(|n| n.status == NodeStatus::Idle)));
        assert!(!f.simulator.is_running());
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&flowcanvas_workflow::CommandOutcome::StatusesReset)
        );
    }

    #[tokio::test]
    async fn failure_marks_current_and_remaining_nodes() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)).failing_at(1));
        let a = add(&f.graph, "manual");
        let b = add(&f.graph, "code");
        let c = add(&f.graph, "http");

        let statuses = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&statuses);
        let reader = f.graph.clone();
        f.graph.subscribe(move |change| {
            if let flowcanvas_workflow::CommandOutcome::NodeUpdated { node_id } = change.outcome {
                if let Some(status) = reader.read(|g| g.node(node_id).map(|n| n.status)) {
                    sink.lock().unwrap().insert(node_id, status);
                }
            }
        });

        let record = f
            .simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.status, ExecutionStatus::Error);
        assert_eq!(record.node_executions.len(), 2);
        assert_eq!(record.node_executions[1].status, NodeExecutionStatus::Error);
        let statuses = statuses.lock().unwrap();
        assert_eq!(statuses[&a], NodeStatus::Success);
        assert_eq!(statuses[&b], NodeStatus::Error);
        assert_eq!(statuses[&c], NodeStatus::Error);

        assert_eq!(f.history.get(record.id).unwrap().status, ExecutionStatus::Error);
        assert!(!f.logs.get_logs(&LogFilter::default().level(LogLevel::Error)).is_empty());
    }

    #[tokio::test]
    async fn disabled_nodes_are_skipped() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        let a = add(&f.graph, "manual");
        f.graph
            .dispatch(GraphCommand::SetNodeDisabled { node_id: a, disabled: true })
            .unwrap();

        let record = f
            .simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
        assert_eq!(record.node_executions[0].status, NodeExecutionStatus::Skipped);
        assert_eq!(f.logs.get_logs(&LogFilter::default().level(LogLevel::Debug)).len(), 1);
    }

    #[tokio::test]
    async fn inputs_come_from_upstream_outputs() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        let hook = add(&f.graph, "webhook");
        let code = add(&f.graph, "code");
        f.graph
            .dispatch(GraphCommand::AddConnection {
                source: PortRef::new(hook, "trigger"),
                target: PortRef::new(code, "input"),
            })
            .unwrap();

        let record = f
            .simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();
        let hook_output = record.node_execution(hook).unwrap().output_data.clone().unwrap();
        let code_input = record.node_execution(code).unwrap().input_data.clone().unwrap();
        assert_eq!(code_input["input"], hook_output);
        assert!(record.node_execution(hook).unwrap().input_data.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_between_nodes() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        let first = add(&f.graph, "manual");
        add(&f.graph, "code");

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        f.simulator.subscribe(move |event| {
            if matches!(event, ExecutionEvent::NodeCompleted { node_id, .. } if *node_id == first) {
                trigger.cancel();
            }
        });

        let record = f.simulator.execute(request(), cancel).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Cancelled);
        assert_eq!(record.node_executions.len(), 1);
        assert_eq!(f.history.get(record.id).unwrap().status, ExecutionStatus::Cancelled);
        assert_eq!(f.logs.get_logs(&LogFilter::default().level(LogLevel::Warning)).len(), 1);
        // No settle delay after cancellation.
        assert_eq!(f.clock.elapsed().num_milliseconds(), 10);
        assert!(f.graph.read(|g| g.nodes().iter().all(|n| n.status == NodeStatus::Idle)));
    }

    #[tokio::test]
    async fn topological_strategy_cycle_fails_run() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        let a = add(&f.graph, "code");
        let b = add(&f.graph, "code");
        for (s, t) in [(a, b), (b, a)] {
            f.graph
                .dispatch(GraphCommand::AddConnection {
                    source: PortRef::new(s, "output"),
                    target: PortRef::new(t, "input"),
                })
                .unwrap();
        }
        let simulator = f
            .simulator
            .clone()
            .with_strategy(Arc::new(crate::strategy::TopologicalOrder));

        let record = simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Error);
        assert!(record.node_executions.is_empty());
    }

    #[tokio::test]
    async fn retry_increments_count_and_warns_past_budget() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        add(&f.graph, "manual");

        let mut previous = f
            .simulator
            .execute(request(), CancellationToken::new())
            .await
            .unwrap();
        previous.retry_count = previous.max_retries;

        let retried = f
            .simulator
            .retry(&previous, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(retried.mode, ExecutionMode::Retry);
        assert_eq!(retried.retry_count, previous.max_retries + 1);
        assert_eq!(retried.status, ExecutionStatus::Success);
        assert_eq!(f.logs.get_logs(&LogFilter::default().level(LogLevel::Warning)).len(), 1);
        assert_eq!(f.history.len(), 2);
    }

    #[tokio::test]
    async fn second_run_is_rejected_while_running() {
        let f = fixture(FixedRandom::new(Duration::from_millis(10)));
        add(&f.graph, "manual");

        let guard = RunningGuard::acquire(&f.simulator.running).unwrap();
        let result = f.simulator.execute(request(), CancellationToken::new()).await;
        assert!(result.is_err());
        drop(guard);
        assert!(f.simulator.execute(request(), CancellationToken::new()).await.is_ok());
    }
}
