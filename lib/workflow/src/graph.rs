//! The authoritative workflow graph.
//!
//! Nodes and connections are kept in collection order (insertion order),
//! which is also the default execution order and the canvas paint order.
//! Structural analysis (cycles, topological order) builds a petgraph
//! `DiGraph` on demand.
//!
//! Every mutation either succeeds completely or returns an error and leaves
//! the graph unchanged. Deserialization re-checks every invariant, so a
//! `WorkflowGraph` value is always well-formed.

use crate::connection::{Connection, PortRef};
use crate::error::{GraphError, InvalidConnection};
use crate::node::{Node, NodeStatus, Point};
use crate::registry::NodeTypeRegistry;
use flowcanvas_core::{ConnectionId, NodeId};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// A node removed from the graph together with the connections that
/// referenced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedNode {
    pub node: Node,
    pub connections: Vec<Connection>,
}

/// A workflow graph: nodes plus the connections between their ports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphParts", into = "GraphParts")]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

/// Serialized form of [`WorkflowGraph`].
#[derive(Serialize, Deserialize)]
struct GraphParts {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl TryFrom<GraphParts> for WorkflowGraph {
    type Error = GraphError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.nodes, parts.connections)
    }
}

impl From<WorkflowGraph> for GraphParts {
    fn from(graph: WorkflowGraph) -> Self {
        Self {
            nodes: graph.nodes,
            connections: graph.connections,
        }
    }
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from raw parts, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: duplicate node, port, or
    /// connection ids, or a connection that [`add_connection`] would reject.
    ///
    /// [`add_connection`]: Self::add_connection
    pub fn from_parts(nodes: Vec<Node>, connections: Vec<Connection>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert_node(node)?;
        }
        for connection in connections {
            graph.insert_connection(connection)?;
        }
        Ok(graph)
    }

    /// Returns all nodes in collection order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all connections in collection order.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or(GraphError::NodeNotFound { node_id })
    }

    /// Returns a connection by its ID.
    #[must_use]
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates a node of `node_type` at `position` and appends it.
    ///
    /// Ports and default parameters come from the registry's template.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNodeType`] if the registry does not know
    /// the type, or [`GraphError::DuplicatePortId`] if its template is
    /// malformed.
    pub fn add_node(
        &mut self,
        registry: &dyn NodeTypeRegistry,
        node_type: &str,
        position: Point,
    ) -> Result<Node, GraphError> {
        let definition =
            registry
                .definition(node_type)
                .ok_or_else(|| GraphError::UnknownNodeType {
                    node_type: node_type.to_string(),
                })?;
        let node = definition.instantiate(position);
        self.insert_node(node.clone())?;
        Ok(node)
    }

    /// Appends a fully-formed node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node id is already used or if two of its
    /// ports on the same side share an id.
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node(node.id).is_some() {
            return Err(GraphError::DuplicateNodeId { node_id: node.id });
        }
        if let Some(port_id) = node.duplicate_port_id() {
            return Err(GraphError::DuplicatePortId {
                node_id: node.id,
                port_id: port_id.to_string(),
            });
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node and every connection that references it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn delete_node(&mut self, node_id: NodeId) -> Result<DeletedNode, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        let node = self.nodes.remove(index);

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.touches(node_id));
        self.connections = kept;

        Ok(DeletedNode {
            node,
            connections: removed,
        })
    }

    /// Moves a node to a new logical position.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn move_node(&mut self, node_id: NodeId, position: Point) -> Result<(), GraphError> {
        self.node_mut(node_id)?.position = position;
        Ok(())
    }

    /// Renames a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn rename_node(&mut self, node_id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        self.node_mut(node_id)?.name = name.into();
        Ok(())
    }

    /// Replaces a node's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn set_parameters(
        &mut self,
        node_id: NodeId,
        parameters: Map<String, JsonValue>,
    ) -> Result<(), GraphError> {
        self.node_mut(node_id)?.parameters = parameters;
        Ok(())
    }

    /// Enables or disables a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn set_node_disabled(&mut self, node_id: NodeId, disabled: bool) -> Result<(), GraphError> {
        self.node_mut(node_id)?.disabled = disabled;
        Ok(())
    }

    /// Sets a node's run status.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node does not exist.
    pub fn set_node_status(&mut self, node_id: NodeId, status: NodeStatus) -> Result<(), GraphError> {
        self.node_mut(node_id)?.status = status;
        Ok(())
    }

    /// Returns every node to `idle`.
    pub fn reset_statuses(&mut self) {
        for node in &mut self.nodes {
            node.status = NodeStatus::Idle;
        }
    }

    /// Checks whether a connection from `source` to `target` would be
    /// accepted, without changing the graph.
    ///
    /// # Errors
    ///
    /// Returns the reason the connection would be rejected.
    pub fn check_connection(
        &self,
        source: &PortRef,
        target: &PortRef,
    ) -> Result<(), InvalidConnection> {
        if source.node_id == target.node_id {
            return Err(InvalidConnection::SelfLoop {
                node_id: source.node_id,
            });
        }

        let source_node =
            self.node(source.node_id)
                .ok_or(InvalidConnection::SourceNodeNotFound {
                    node_id: source.node_id,
                })?;
        let target_node =
            self.node(target.node_id)
                .ok_or(InvalidConnection::TargetNodeNotFound {
                    node_id: target.node_id,
                })?;

        let source_port = source_node.output_port(&source.port_id).ok_or_else(|| {
            InvalidConnection::SourcePortNotFound {
                port: source.clone(),
            }
        })?;
        let target_port = target_node.input_port(&target.port_id).ok_or_else(|| {
            InvalidConnection::TargetPortNotFound {
                port: target.clone(),
            }
        })?;

        if !target_port.kind.accepts(source_port.kind) {
            return Err(InvalidConnection::IncompatiblePorts {
                source: source.clone(),
                target: target.clone(),
            });
        }

        if let Some(existing) = self.connections.iter().find(|c| c.links(source, target)) {
            return Err(InvalidConnection::Duplicate {
                existing: existing.id,
            });
        }

        Ok(())
    }

    /// Connects an output port to an input port.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConnection`] for a self-loop, a duplicate,
    /// a missing node or port, or incompatible port kinds.
    pub fn add_connection(
        &mut self,
        source: PortRef,
        target: PortRef,
    ) -> Result<Connection, GraphError> {
        self.check_connection(&source, &target)?;
        let connection = Connection::new(source, target);
        self.connections.push(connection.clone());
        Ok(connection)
    }

    /// Appends a fully-formed connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection id is already used, or for any
    /// reason [`add_connection`](Self::add_connection) would reject it.
    pub fn insert_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        if self.connection(connection.id).is_some() {
            return Err(GraphError::DuplicateConnectionId {
                connection_id: connection.id,
            });
        }
        self.check_connection(&connection.source(), &connection.target())?;
        self.connections.push(connection);
        Ok(())
    }

    /// Removes a connection.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConnectionNotFound`] if it does not exist.
    pub fn delete_connection(&mut self, connection_id: ConnectionId) -> Result<Connection, GraphError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.id == connection_id)
            .ok_or(GraphError::ConnectionNotFound { connection_id })?;
        Ok(self.connections.remove(index))
    }

    /// Returns every connection that starts or ends at `node_id`.
    #[must_use]
    pub fn connections_for_node(&self, node_id: NodeId) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.touches(node_id))
            .collect()
    }

    /// Returns the upstream nodes of `node_id` with the connection that links
    /// each one, in connection order.
    #[must_use]
    pub fn predecessors(&self, node_id: NodeId) -> Vec<(&Node, &Connection)> {
        self.connections
            .iter()
            .filter(|c| c.target_node_id == node_id)
            .filter_map(|c| Some((self.node(c.source_node_id)?, c)))
            .collect()
    }

    /// Returns the downstream nodes of `node_id` with the connection that
    /// links each one, in connection order.
    #[must_use]
    pub fn successors(&self, node_id: NodeId) -> Vec<(&Node, &Connection)> {
        self.connections
            .iter()
            .filter(|c| c.source_node_id == node_id)
            .filter_map(|c| Some((self.node(c.target_node_id)?, c)))
            .collect()
    }

    /// Returns nodes without incoming connections.
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| !self.connections.iter().any(|c| c.target_node_id == n.id))
            .collect()
    }

    /// Builds a petgraph view of the graph, one petgraph node per workflow
    /// node in collection order.
    fn to_digraph(&self) -> DiGraph<NodeId, ConnectionId> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.connections.len());
        let index: HashMap<NodeId, NodeIndex> = self
            .nodes
            .iter()
            .map(|n| (n.id, graph.add_node(n.id)))
            .collect();
        for connection in &self.connections {
            if let (Some(&source), Some(&target)) = (
                index.get(&connection.source_node_id),
                index.get(&connection.target_node_id),
            ) {
                graph.add_edge(source, target, connection.id);
            }
        }
        graph
    }

    /// Returns every structural problem in the graph.
    ///
    /// Checks:
    /// - All required input ports have an incoming connection
    /// - No cycles
    #[must_use]
    pub fn validation_issues(&self) -> Vec<GraphError> {
        let mut issues = Vec::new();

        for node in &self.nodes {
            for input in node.inputs.iter().filter(|p| p.required) {
                let connected = self
                    .connections
                    .iter()
                    .any(|c| c.target_node_id == node.id && c.target_port_id == input.id);
                if !connected {
                    issues.push(GraphError::RequiredInputMissing {
                        node_id: node.id,
                        port_id: input.id.clone(),
                    });
                }
            }
        }

        if petgraph::algo::is_cyclic_directed(&self.to_digraph()) {
            issues.push(GraphError::CycleDetected);
        }

        issues
    }

    /// Validates the workflow graph.
    ///
    /// # Errors
    ///
    /// Returns the first issue reported by
    /// [`validation_issues`](Self::validation_issues).
    pub fn validate(&self) -> Result<(), GraphError> {
        match self.validation_issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Returns node ids ordered so that every connection points forward.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CycleDetected`] if no such order exists.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let graph = self.to_digraph();
        let order = petgraph::algo::toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;
        Ok(order.into_iter().map(|index| graph[index]).collect())
    }
}
