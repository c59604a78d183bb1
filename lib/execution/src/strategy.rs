//! Node visiting order.

use flowcanvas_core::NodeId;
use flowcanvas_workflow::{GraphError, WorkflowGraph};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Chooses the order in which the simulator visits nodes.
pub trait ExecutionOrderStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Returns every node id exactly once.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the graph cannot be ordered.
    fn order(&self, graph: &WorkflowGraph) -> Result<Vec<NodeId>, GraphError>;
}

/// Node collection order, ignoring connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionOrder;

impl ExecutionOrderStrategy for CollectionOrder {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn order(&self, graph: &WorkflowGraph) -> Result<Vec<NodeId>, GraphError> {
        Ok(graph.nodes().iter().map(|n| n.id).collect())
    }
}

/// Dependency order over connections. Fails on cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalOrder;

impl ExecutionOrderStrategy for TopologicalOrder {
    fn name(&self) -> &'static str {
        "topological"
    }

    fn order(&self, graph: &WorkflowGraph) -> Result<Vec<NodeId>, GraphError> {
        graph.topological_order()
    }
}

/// Configurable selector for the built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStrategyKind {
    #[default]
    Collection,
    Topological,
}

impl OrderStrategyKind {
    #[must_use]
    pub fn strategy(self) -> Arc<dyn ExecutionOrderStrategy> {
        match self {
            Self::Collection => Arc::new(CollectionOrder),
            Self::Topological => Arc::new(TopologicalOrder),
        }
    }
}

impl fmt::Display for OrderStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection => write!(f, "collection"),
            Self::Topological => write!(f, "topological"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcanvas_workflow::{BuiltinNodeTypes, Point, PortRef};

    #[test]
    fn collection_and_topological_differ_for_reversed_wiring() {
        let registry = BuiltinNodeTypes::default();
        let mut graph = WorkflowGraph::new();
        let http = graph.add_node(&registry, "http", Point::ZERO).unwrap();
        let hook = graph.add_node(&registry, "webhook", Point::new(0.0, 100.0)).unwrap();
        graph
            .add_connection(
                PortRef::new(hook.id, "trigger"),
                PortRef::new(http.id, "input"),
            )
            .unwrap();

        assert_eq!(CollectionOrder.order(&graph).unwrap(), vec![http.id, hook.id]);
        assert_eq!(TopologicalOrder.order(&graph).unwrap(), vec![hook.id, http.id]);
    }
}
