//! Workflow node types.
//!
//! Nodes are the building blocks of workflows. Each node has:
//! - A unique ID within the workflow
//! - A type string that selects its ports and simulated behavior
//! - A logical (world-space) position on the canvas
//! - Free-form parameters edited by type-specific configuration panels
//! - Input and output ports, fixed by the type at creation time
//! - A run status and a disabled flag

use crate::port::Port;
use flowcanvas_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// A 2D point. Used both for logical canvas positions and screen positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Run status of a node as shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// The node type (e.g. `"webhook"`, `"http"`).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Human-readable name for this node.
    pub name: String,
    /// Logical canvas position of the node's top-left corner.
    pub position: Point,
    /// Type-specific parameters.
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
    /// Input ports for this node.
    pub inputs: Vec<Port>,
    /// Output ports for this node.
    pub outputs: Vec<Port>,
    /// Current run status.
    #[serde(default)]
    pub status: NodeStatus,
    /// Disabled nodes are skipped by the simulator.
    #[serde(default)]
    pub disabled: bool,
}

impl Node {
    /// Creates a new idle node with a fresh ID.
    #[must_use]
    pub fn new(
        node_type: impl Into<String>,
        name: impl Into<String>,
        position: Point,
        inputs: Vec<Port>,
        outputs: Vec<Port>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            name: name.into(),
            position,
            parameters: Map::new(),
            inputs,
            outputs,
            status: NodeStatus::Idle,
            disabled: false,
        }
    }

    /// Returns the input port with the given id, if any.
    #[must_use]
    pub fn input_port(&self, id: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Returns the output port with the given id, if any.
    #[must_use]
    pub fn output_port(&self, id: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Returns true if the node has no inputs (it can only start a flow).
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Returns a string parameter, if present.
    #[must_use]
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(JsonValue::as_str)
    }

    /// Returns the first port id that appears more than once across this
    /// node's inputs or across its outputs.
    #[must_use]
    pub fn duplicate_port_id(&self) -> Option<&str> {
        fn first_duplicate(ports: &[Port]) -> Option<&str> {
            ports.iter().enumerate().find_map(|(i, port)| {
                ports[..i]
                    .iter()
                    .any(|earlier| earlier.id == port.id)
                    .then_some(port.id.as_str())
            })
        }
        first_duplicate(&self.inputs).or_else(|| first_duplicate(&self.outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_node() -> Node {
        Node::new(
            "http",
            "HTTP Request",
            Point::new(10.0, 20.0),
            vec![Port::data("input", "Input").required()],
            vec![Port::data("output", "Output")],
        )
    }

    #[test]
    fn point_arithmetic() {
        let p = Point::new(4.0, 6.0);
        assert_eq!(p + Point::new(1.0, 1.0), Point::new(5.0, 7.0));
        assert_eq!(p - Point::new(1.0, 1.0), Point::new(3.0, 5.0));
        assert_eq!(p * 0.5, Point::new(2.0, 3.0));
        assert_eq!(p / 2.0, Point::new(2.0, 3.0));
        assert!((Point::ZERO.distance(Point::new(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn new_node_is_idle_and_enabled() {
        let node = http_node();
        assert_eq!(node.status, NodeStatus::Idle);
        assert!(!node.disabled);
        assert!(!node.is_trigger());
    }

    #[test]
    fn port_lookup_is_directional() {
        let node = http_node();
        assert!(node.input_port("input").is_some());
        assert!(node.output_port("input").is_none());
        assert!(node.output_port("output").is_some());
    }

    #[test]
    fn detects_duplicate_port_ids() {
        let mut node = http_node();
        assert_eq!(node.duplicate_port_id(), None);
        node.outputs.push(Port::data("output", "Again"));
        assert_eq!(node.duplicate_port_id(), Some("output"));
    }

    #[test]
    fn type_field_serializes_as_type() {
        let node = http_node();
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["type"], "http");
        assert_eq!(json["status"], "idle");
        assert!(json.get("nodeType").is_none());
    }
}
