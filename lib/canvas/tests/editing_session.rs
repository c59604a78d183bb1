//! A full editing session driven only by pointer events.

use flowcanvas_canvas::{CanvasConfig, CanvasEngine, CanvasEvent, NODE_HEIGHT, NODE_WIDTH};
use flowcanvas_workflow::{
    BuiltinNodeTypes, CommandOutcome, GraphCommand, GraphHandle, Point, WorkflowGraph,
};
use std::sync::Arc;

fn add(handle: &GraphHandle, node_type: &str, position: Point) {
    let outcome = handle
        .dispatch(GraphCommand::AddNode {
            node_type: node_type.into(),
            position,
        })
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::NodeAdded(_)));
}

#[test]
fn build_wire_move_and_delete() {
    let handle = GraphHandle::new(WorkflowGraph::new(), Arc::new(BuiltinNodeTypes::default()));
    add(&handle, "webhook", Point::new(0.0, 0.0));
    add(&handle, "http", Point::new(300.0, 0.0));
    let mut engine = CanvasEngine::new(handle.clone(), CanvasConfig::default());

    // Wire webhook.trigger -> http.input.
    let out = Point::new(NODE_WIDTH, NODE_HEIGHT / 2.0);
    let input = Point::new(300.0, NODE_HEIGHT / 2.0);
    engine.pointer_down(out);
    assert!(matches!(engine.pointer_up(input), CanvasEvent::ConnectionCreated(_)));

    // Drag http down; the routed curve follows.
    engine.pointer_down(Point::new(350.0, 30.0));
    engine.pointer_move(Point::new(350.0, 230.0));
    engine.pointer_up(Point::new(350.0, 230.0));
    let routed = engine.routed_connections();
    assert_eq!(routed[0].path.end, Point::new(300.0, 200.0 + NODE_HEIGHT / 2.0));

    // Zoomed in, the curve scales with the viewport.
    engine.zoom_in();
    let zoomed = engine.routed_connections();
    assert!((zoomed[0].path.end.y - (230.0 * 1.2)).abs() < 1e-9);

    // Select http by clicking it and delete: connection cascades.
    engine.reset_view();
    engine.pointer_down(Point::new(350.0, 220.0));
    engine.pointer_up(Point::new(350.0, 220.0));
    let outcome = engine.delete_selection().unwrap().unwrap();
    match outcome {
        CommandOutcome::NodeDeleted(deleted) => assert_eq!(deleted.connections.len(), 1),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(handle.read(WorkflowGraph::connection_count), 0);
    assert_eq!(handle.read(WorkflowGraph::node_count), 1);
}

#[test]
fn fit_to_graph_frames_nodes() {
    let handle = GraphHandle::new(WorkflowGraph::new(), Arc::new(BuiltinNodeTypes::default()));
    add(&handle, "manual", Point::new(-2000.0, -1000.0));
    add(&handle, "code", Point::new(2000.0, 1000.0));
    let mut engine = CanvasEngine::new(handle, CanvasConfig::default());

    engine.fit_to_graph(1280.0, 720.0);
    let zoom = engine.viewport().zoom;
    assert!(zoom < 1.0 && zoom >= 0.1);
}
