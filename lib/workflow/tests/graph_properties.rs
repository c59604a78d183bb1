//! Structural invariants of the graph model exercised through the public API.

use flowcanvas_core::{NodeId, WorkflowId};
use flowcanvas_workflow::{
    BuiltinNodeTypes, GraphCommand, GraphHandle, InvalidConnection, JsonFileWorkflowStore, Point,
    PortRef, Workflow, WorkflowGraph, WorkflowStore,
};
use std::sync::Arc;

fn builtins() -> BuiltinNodeTypes {
    BuiltinNodeTypes::default()
}

/// Builds a small graph with every builtin type, wired where kinds allow.
fn busy_graph() -> (WorkflowGraph, Vec<NodeId>) {
    let registry = builtins();
    let mut graph = WorkflowGraph::new();
    let mut ids = Vec::new();
    for (i, ty) in ["webhook", "http", "code", "if", "merge", "ai", "jira"]
        .iter()
        .enumerate()
    {
        let node = graph
            .add_node(&registry, ty, Point::new(i as f64 * 200.0, 0.0))
            .unwrap();
        ids.push(node.id);
    }
    let links = [
        ((0, "trigger"), (1, "input")),
        ((1, "output"), (2, "input")),
        ((2, "output"), (3, "input")),
        ((3, "true"), (4, "input1")),
        ((1, "output"), (4, "input2")),
        ((4, "output"), (5, "input")),
        ((5, "output"), (6, "input")),
    ];
    for ((s, sp), (t, tp)) in links {
        graph
            .add_connection(PortRef::new(ids[s], sp), PortRef::new(ids[t], tp))
            .unwrap();
    }
    (graph, ids)
}

#[test]
fn self_connections_are_always_rejected() {
    let (mut graph, ids) = busy_graph();
    let before = graph.connection_count();

    for &id in &ids {
        let node = graph.node(id).unwrap().clone();
        for output in &node.outputs {
            for input in &node.inputs {
                let err = graph
                    .add_connection(PortRef::new(id, &output.id), PortRef::new(id, &input.id))
                    .unwrap_err();
                assert_eq!(
                    err.as_invalid_connection(),
                    Some(&InvalidConnection::SelfLoop { node_id: id })
                );
            }
        }
    }
    assert_eq!(graph.connection_count(), before);
}

#[test]
fn repeating_a_connection_is_rejected() {
    let (mut graph, _) = busy_graph();
    let existing: Vec<_> = graph.connections().to_vec();

    for connection in existing {
        let err = graph
            .add_connection(connection.source(), connection.target())
            .unwrap_err();
        assert_eq!(
            err.as_invalid_connection(),
            Some(&InvalidConnection::Duplicate {
                existing: connection.id
            })
        );
    }
}

#[test]
fn deleting_any_node_leaves_no_dangling_connections() {
    let (original, ids) = busy_graph();

    for &id in &ids {
        let mut graph = original.clone();
        graph.delete_node(id).unwrap();
        assert!(
            graph.connections().iter().all(|c| !c.touches(id)),
            "connection still references deleted node {id}"
        );
        // Remaining graph must survive a serialization round trip.
        let json = serde_json::to_string(&graph).unwrap();
        let _: WorkflowGraph = serde_json::from_str(&json).unwrap();
    }
}

#[test]
fn busy_graph_validates_and_orders() {
    let (graph, ids) = busy_graph();
    assert_eq!(graph.validate(), Ok(()));

    let order = graph.topological_order().unwrap();
    assert_eq!(order.len(), ids.len());
    for connection in graph.connections() {
        let pos = |id| order.iter().position(|n| *n == id).unwrap();
        assert!(pos(connection.source_node_id) < pos(connection.target_node_id));
    }
}

#[test]
fn handle_commands_match_direct_mutation() {
    let handle = GraphHandle::new(WorkflowGraph::new(), Arc::new(builtins()));
    handle
        .dispatch(GraphCommand::AddNode {
            node_type: "manual".into(),
            position: Point::ZERO,
        })
        .unwrap();
    let err = handle
        .dispatch(GraphCommand::AddNode {
            node_type: "nope".into(),
            position: Point::ZERO,
        })
        .unwrap_err();
    assert!(err.to_string().contains("unknown node type"));
    assert_eq!(handle.read(WorkflowGraph::node_count), 1);
}

#[tokio::test]
async fn json_file_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileWorkflowStore::new(dir.path().join("workflows"));
    assert!(store.list().await.unwrap().is_empty());

    let (graph, _) = busy_graph();
    let workflow = Workflow::with_graph("Busy", graph);
    store.save(&workflow).await.unwrap();

    let loaded = store.load(workflow.id).await.unwrap();
    assert_eq!(loaded, workflow);

    let copy = store.duplicate(workflow.id).await.unwrap();
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|s| s.id == copy.id));

    store.delete(workflow.id).await.unwrap();
    assert!(store.load(workflow.id).await.is_err());
    assert!(store.delete(WorkflowId::new()).await.is_err());
}

#[tokio::test]
async fn json_file_store_skips_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileWorkflowStore::new(dir.path());
    store.save(&Workflow::new("Good")).await.unwrap();
    tokio::fs::write(dir.path().join("broken.json"), "{")
        .await
        .unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Good");
}
