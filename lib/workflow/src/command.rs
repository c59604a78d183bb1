//! Command interface to the graph model.
//!
//! Callers never touch node or connection lists directly. They describe a
//! change as a [`GraphCommand`] and hand it to [`GraphHandle::dispatch`],
//! which applies it under the graph lock and then publishes a
//! [`GraphChange`] to subscribers.

use crate::connection::{Connection, PortRef};
use crate::error::GraphError;
use crate::graph::{DeletedNode, WorkflowGraph};
use crate::node::{Node, NodeStatus, Point};
use crate::registry::NodeTypeRegistry;
use flowcanvas_core::{ConnectionId, Emitter, NodeId, SubscriptionId};
use serde_json::{Map, Value as JsonValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, trace};

/// A single mutation of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCommand {
    /// Create a node from the registry template.
    AddNode { node_type: String, position: Point },
    /// Remove a node and its connections.
    DeleteNode { node_id: NodeId },
    /// Move a node to a logical position.
    MoveNode { node_id: NodeId, position: Point },
    /// Connect an output port to an input port.
    AddConnection { source: PortRef, target: PortRef },
    /// Remove a connection.
    DeleteConnection { connection_id: ConnectionId },
    /// Rename a node.
    RenameNode { node_id: NodeId, name: String },
    /// Replace a node's parameters.
    SetParameters {
        node_id: NodeId,
        parameters: Map<String, JsonValue>,
    },
    /// Enable or disable a node.
    SetNodeDisabled { node_id: NodeId, disabled: bool },
    /// Set a node's run status.
    SetNodeStatus { node_id: NodeId, status: NodeStatus },
    /// Return every node to `idle`.
    ResetStatuses,
    /// Swap in a whole graph (loading or importing a workflow).
    ReplaceGraph { graph: WorkflowGraph },
}

impl GraphCommand {
    /// Short name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::DeleteNode { .. } => "delete_node",
            Self::MoveNode { .. } => "move_node",
            Self::AddConnection { .. } => "add_connection",
            Self::DeleteConnection { .. } => "delete_connection",
            Self::RenameNode { .. } => "rename_node",
            Self::SetParameters { .. } => "set_parameters",
            Self::SetNodeDisabled { .. } => "set_node_disabled",
            Self::SetNodeStatus { .. } => "set_node_status",
            Self::ResetStatuses => "reset_statuses",
            Self::ReplaceGraph { .. } => "replace_graph",
        }
    }
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    NodeAdded(Node),
    NodeDeleted(DeletedNode),
    NodeMoved { node_id: NodeId, position: Point },
    ConnectionAdded(Connection),
    ConnectionDeleted(Connection),
    /// A node's name, parameters, disabled flag, or status changed.
    NodeUpdated { node_id: NodeId },
    StatusesReset,
    GraphReplaced,
}

/// Notification published after every successful command.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphChange {
    /// Monotonic counter, incremented once per successful command.
    pub revision: u64,
    pub outcome: CommandOutcome,
}

impl WorkflowGraph {
    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying operation; the graph is unchanged.
    pub fn apply(
        &mut self,
        registry: &dyn NodeTypeRegistry,
        command: GraphCommand,
    ) -> Result<CommandOutcome, GraphError> {
        match command {
            GraphCommand::AddNode {
                node_type,
                position,
            } => self
                .add_node(registry, &node_type, position)
                .map(CommandOutcome::NodeAdded),
            GraphCommand::DeleteNode { node_id } => {
                self.delete_node(node_id).map(CommandOutcome::NodeDeleted)
            }
            GraphCommand::MoveNode { node_id, position } => {
                self.move_node(node_id, position)?;
                Ok(CommandOutcome::NodeMoved { node_id, position })
            }
            GraphCommand::AddConnection { source, target } => self
                .add_connection(source, target)
                .map(CommandOutcome::ConnectionAdded),
            GraphCommand::DeleteConnection { connection_id } => self
                .delete_connection(connection_id)
                .map(CommandOutcome::ConnectionDeleted),
            GraphCommand::RenameNode { node_id, name } => {
                self.rename_node(node_id, name)?;
                Ok(CommandOutcome::NodeUpdated { node_id })
            }
            GraphCommand::SetParameters {
                node_id,
                parameters,
            } => {
                self.set_parameters(node_id, parameters)?;
                Ok(CommandOutcome::NodeUpdated { node_id })
            }
            GraphCommand::SetNodeDisabled { node_id, disabled } => {
                self.set_node_disabled(node_id, disabled)?;
                Ok(CommandOutcome::NodeUpdated { node_id })
            }
            GraphCommand::SetNodeStatus { node_id, status } => {
                self.set_node_status(node_id, status)?;
                Ok(CommandOutcome::NodeUpdated { node_id })
            }
            GraphCommand::ResetStatuses => {
                self.reset_statuses();
                Ok(CommandOutcome::StatusesReset)
            }
            GraphCommand::ReplaceGraph { graph } => {
                *self = graph;
                Ok(CommandOutcome::GraphReplaced)
            }
        }
    }
}

/// Shared owner of the one authoritative graph.
///
/// Cloning the handle shares the graph, the registry, and the subscriber
/// list. The internal locks are only held for the duration of a single
/// command or read closure and never across an `.await`.
#[derive(Clone)]
pub struct GraphHandle {
    graph: Arc<RwLock<WorkflowGraph>>,
    /// Held across a command and its notification.
    dispatch: Arc<Mutex<()>>,
    registry: Arc<dyn NodeTypeRegistry>,
    changes: Arc<Emitter<GraphChange>>,
    revision: Arc<AtomicU64>,
}

impl GraphHandle {
    /// Wraps `graph` for shared use.
    #[must_use]
    pub fn new(graph: WorkflowGraph, registry: Arc<dyn NodeTypeRegistry>) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            dispatch: Arc::new(Mutex::new(())),
            registry,
            changes: Arc::new(Emitter::new()),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the node-type registry used for `AddNode`.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn NodeTypeRegistry> {
        &self.registry
    }

    /// Applies a command and notifies subscribers on success.
    ///
    /// Commands and their notifications are serialized, so subscribers see
    /// revisions in increasing order. Subscribers run after the graph lock is
    /// released and may read the graph, but must not dispatch.
    ///
    /// # Errors
    ///
    /// Returns the rejection; the graph is unchanged and nothing is published.
    pub fn dispatch(&self, command: GraphCommand) -> Result<CommandOutcome, GraphError> {
        let name = command.name();
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        let change = {
            let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
            match graph.apply(self.registry.as_ref(), command) {
                Ok(outcome) => GraphChange {
                    revision: self.revision.fetch_add(1, Ordering::SeqCst) + 1,
                    outcome,
                },
                Err(err) => {
                    debug!(command = name, error = %err, "graph command rejected");
                    return Err(err);
                }
            }
        };
        trace!(command = name, revision = change.revision, "graph command applied");
        self.changes.emit(&change);
        Ok(change.outcome)
    }

    /// Runs `f` with shared access to the graph.
    pub fn read<R>(&self, f: impl FnOnce(&WorkflowGraph) -> R) -> R {
        let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
        f(&graph)
    }

    /// Returns a copy of the current graph.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowGraph {
        self.read(WorkflowGraph::clone)
    }

    /// Returns the number of successful commands applied so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Subscribes to graph changes.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&GraphChange) + Send + Sync + 'static,
    {
        self.changes.subscribe(listener)
    }

    /// Removes a graph change subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }
}

impl std::fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphHandle")
            .field("revision", &self.revision())
            .field("nodes", &self.read(WorkflowGraph::node_count))
            .finish_non_exhaustive()
    }
}
