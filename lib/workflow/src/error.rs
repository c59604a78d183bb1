//! Error types for the workflow crate.
//!
//! - `GraphError`: Graph model operations (nodes, ports, connections)
//! - `InvalidConnection`: Why a connection attempt was rejected
//! - `StoreError`: Persistence operations (wrapped in a rootcause `Report`)
//!
//! Graph errors are plain values: a rejected mutation leaves the graph
//! unchanged and the caller decides whether to surface the rejection.

use crate::connection::PortRef;
use flowcanvas_core::{ConnectionId, NodeId, WorkflowId};
use std::fmt;

/// Reasons a connection attempt is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidConnection {
    /// Source and target are the same node.
    SelfLoop { node_id: NodeId },
    /// An identical connection already exists.
    Duplicate { existing: ConnectionId },
    /// Source node does not exist.
    SourceNodeNotFound { node_id: NodeId },
    /// Target node does not exist.
    TargetNodeNotFound { node_id: NodeId },
    /// Source port is not an output of the source node.
    SourcePortNotFound { port: PortRef },
    /// Target port is not an input of the target node.
    TargetPortNotFound { port: PortRef },
    /// Target port does not accept the source port's kind.
    IncompatiblePorts { source: PortRef, target: PortRef },
}

impl fmt::Display for InvalidConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfLoop { node_id } => {
                write!(f, "node {node_id} cannot connect to itself")
            }
            Self::Duplicate { existing } => {
                write!(f, "identical connection {existing} already exists")
            }
            Self::SourceNodeNotFound { node_id } => {
                write!(f, "source node not found: {node_id}")
            }
            Self::TargetNodeNotFound { node_id } => {
                write!(f, "target node not found: {node_id}")
            }
            Self::SourcePortNotFound { port } => {
                write!(f, "output port not found: {port}")
            }
            Self::TargetPortNotFound { port } => {
                write!(f, "input port not found: {port}")
            }
            Self::IncompatiblePorts { source, target } => {
                write!(f, "incompatible ports: {source} -> {target}")
            }
        }
    }
}

/// Errors from graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Connection with the given ID was not found in the graph.
    ConnectionNotFound { connection_id: ConnectionId },
    /// The registry has no definition for this node type.
    UnknownNodeType { node_type: String },
    /// A node with this ID is already in the graph.
    DuplicateNodeId { node_id: NodeId },
    /// A connection with this ID is already in the graph.
    DuplicateConnectionId { connection_id: ConnectionId },
    /// Two ports on the same side of one node share an id.
    DuplicatePortId { node_id: NodeId, port_id: String },
    /// A connection attempt was rejected.
    InvalidConnection(InvalidConnection),
    /// A required input port has no incoming connection.
    RequiredInputMissing { node_id: NodeId, port_id: String },
    /// Graph contains cycles.
    CycleDetected,
}

impl GraphError {
    /// Returns the connection rejection reason, if this is one.
    #[must_use]
    pub fn as_invalid_connection(&self) -> Option<&InvalidConnection> {
        match self {
            Self::InvalidConnection(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::ConnectionNotFound { connection_id } => {
                write!(f, "connection not found: {connection_id}")
            }
            Self::UnknownNodeType { node_type } => {
                write!(f, "unknown node type '{node_type}'")
            }
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::DuplicateConnectionId { connection_id } => {
                write!(f, "duplicate connection id: {connection_id}")
            }
            Self::DuplicatePortId { node_id, port_id } => {
                write!(f, "port id '{port_id}' is used twice on node {node_id}")
            }
            Self::InvalidConnection(reason) => write!(f, "invalid connection: {reason}"),
            Self::RequiredInputMissing { node_id, port_id } => {
                write!(
                    f,
                    "required input port '{port_id}' on node {node_id} has no incoming connection"
                )
            }
            Self::CycleDetected => write!(f, "graph contains cycles"),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<InvalidConnection> for GraphError {
    fn from(reason: InvalidConnection) -> Self {
        Self::InvalidConnection(reason)
    }
}

/// Errors from workflow persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Workflow not found.
    NotFound { workflow_id: WorkflowId },
    /// The serialized form could not be parsed or violates graph invariants.
    InvalidFormat { details: String },
    /// Serialization failed.
    Serialization { details: String },
    /// Underlying storage failed.
    Io { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { workflow_id } => write!(f, "workflow not found: {workflow_id}"),
            Self::InvalidFormat { details } => write!(f, "invalid workflow format: {details}"),
            Self::Serialization { details } => {
                write!(f, "workflow serialization failed: {details}")
            }
            Self::Io { details } => write!(f, "workflow storage failed: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let err = GraphError::NodeNotFound { node_id };
        assert!(err.to_string().contains("node not found"));
    }

    #[test]
    fn invalid_connection_wraps() {
        let node_id = NodeId::new();
        let err = GraphError::from(InvalidConnection::SelfLoop { node_id });
        assert!(err.to_string().contains("cannot connect to itself"));
        assert_eq!(
            err.as_invalid_connection(),
            Some(&InvalidConnection::SelfLoop { node_id })
        );
    }

    #[test]
    fn store_error_display() {
        let workflow_id = WorkflowId::new();
        let err = StoreError::NotFound { workflow_id };
        assert!(err.to_string().contains("workflow not found"));
    }
}
