use flowcanvas_canvas::CanvasEvent;
use flowcanvas_editor::app::{EditorApp, demo_workflow};
use flowcanvas_editor::config::EditorConfig;
use flowcanvas_execution::{FixedRandom, VirtualClock};
use flowcanvas_store::{HistoryFilter, LogFilter, LogStore, LogStoreConfig};
use flowcanvas_workflow::{
    BuiltinNodeTypes, ExecutionStatus, JsonFileWorkflowStore, WorkflowStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn app() -> EditorApp {
    let registry = Arc::new(BuiltinNodeTypes::default());
    let workflow = demo_workflow(registry.as_ref()).unwrap();
    let mut app = EditorApp::init(&EditorConfig::default(), workflow, registry);
    app.set_clock(Arc::new(VirtualClock::default()));
    app.set_random(Arc::new(FixedRandom::new(Duration::from_millis(1200))));
    app
}

#[tokio::test]
async fn run_export_and_save() {
    let app = app();
    let record = app.run(CancellationToken::new()).await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert_eq!(record.triggered_by, "editor");
    assert_eq!(record.node_executions.len(), 3);
    assert_eq!(app.history().list(&HistoryFilter::default()).len(), 1);

    let exported = app.logs().export_json(&LogFilter::default()).unwrap();
    let reloaded = LogStore::init(LogStoreConfig::default());
    assert_eq!(reloaded.import_json(&exported).unwrap(), app.logs().len());

    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileWorkflowStore::new(dir.path());
    let workflow = app.workflow();
    store.save(&workflow).await.unwrap();
    let loaded = store.load(workflow.id).await.unwrap();
    assert_eq!(loaded.graph, workflow.graph);

    app.dispose();
}

#[tokio::test]
async fn canvas_deletion_is_visible_to_the_next_run() {
    let mut app = app();
    app.canvas_mut().fit_to_graph(1280.0, 800.0);

    let routed = app.canvas().routed_connections();
    assert_eq!(routed.len(), 2);
    let midpoint = routed[0].path.point_at(0.5);
    assert_eq!(
        app.canvas_mut().pointer_down(midpoint),
        CanvasEvent::ConnectionSelected {
            connection_id: routed[0].id()
        }
    );
    assert!(app.canvas_mut().delete_selection().unwrap().is_ok());
    assert_eq!(app.workflow().graph.connection_count(), 1);

    let record = app.run(CancellationToken::new()).await.unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    let http = &record.node_executions[1];
    assert!(http.input_data.is_none());
}
