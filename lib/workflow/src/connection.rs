//! Connections between node ports.
//!
//! A connection carries data from a source node's output port to a target
//! node's input port. Connections reference nodes by id and never own them.

use flowcanvas_core::{ConnectionId, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One endpoint of a connection: a port on a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    /// The node owning the port.
    pub node_id: NodeId,
    /// The port id on that node.
    pub port_id: String,
}

impl PortRef {
    /// Creates a port reference.
    #[must_use]
    pub fn new(node_id: NodeId, port_id: impl Into<String>) -> Self {
        Self {
            node_id,
            port_id: port_id.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.port_id)
    }
}

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier within the graph.
    pub id: ConnectionId,
    /// The source node.
    pub source_node_id: NodeId,
    /// The output port on the source node.
    pub source_port_id: String,
    /// The target node.
    pub target_node_id: NodeId,
    /// The input port on the target node.
    pub target_port_id: String,
}

impl Connection {
    /// Creates a connection with a fresh ID.
    #[must_use]
    pub fn new(source: PortRef, target: PortRef) -> Self {
        Self {
            id: ConnectionId::new(),
            source_node_id: source.node_id,
            source_port_id: source.port_id,
            target_node_id: target.node_id,
            target_port_id: target.port_id,
        }
    }

    /// Returns the source endpoint.
    #[must_use]
    pub fn source(&self) -> PortRef {
        PortRef::new(self.source_node_id, self.source_port_id.clone())
    }

    /// Returns the target endpoint.
    #[must_use]
    pub fn target(&self) -> PortRef {
        PortRef::new(self.target_node_id, self.target_port_id.clone())
    }

    /// Returns true if this connection links exactly these two endpoints.
    #[must_use]
    pub fn links(&self, source: &PortRef, target: &PortRef) -> bool {
        self.source_node_id == source.node_id
            && self.source_port_id == source.port_id
            && self.target_node_id == target.node_id
            && self.target_port_id == target.port_id
    }

    /// Returns true if either endpoint is on `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}
