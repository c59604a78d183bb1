//! Port system for workflow nodes.
//!
//! Ports are named connection points on nodes. Every port has a [`PortKind`]
//! describing what flows through it. A connection is only valid when the
//! target input port accepts the kind of the source output port.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of signal a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Activation without payload (trigger nodes fire through these).
    Trigger,
    /// Arbitrary JSON payload.
    Data,
    /// Outcome of a branch decision.
    Condition,
}

impl PortKind {
    /// Checks if an input port of this kind accepts a connection from an
    /// output port of kind `source`.
    ///
    /// Data inputs accept everything, trigger inputs accept triggers and
    /// conditions, and condition inputs accept only conditions.
    #[must_use]
    pub fn accepts(self, source: Self) -> bool {
        match self {
            Self::Data => true,
            Self::Trigger => matches!(source, Self::Trigger | Self::Condition),
            Self::Condition => source == Self::Condition,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Data => write!(f, "data"),
            Self::Condition => write!(f, "condition"),
        }
    }
}

/// A connection point on a workflow node.
///
/// Whether a port is an input or an output is decided by which list of the
/// owning node it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Identifier, unique within the owning node.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// What flows through this port.
    pub kind: PortKind,
    /// Whether an input port must have an incoming connection.
    #[serde(default)]
    pub required: bool,
}

impl Port {
    /// Creates an optional port.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// Creates an optional trigger port.
    #[must_use]
    pub fn trigger(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, PortKind::Trigger)
    }

    /// Creates an optional data port.
    #[must_use]
    pub fn data(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, PortKind::Data)
    }

    /// Creates an optional condition port.
    #[must_use]
    pub fn condition(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, PortKind::Condition)
    }

    /// Marks this port as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
