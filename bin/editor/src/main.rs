use chrono::Utc;
use clap::{Parser, ValueEnum};
use flowcanvas_editor::app::{EditorApp, demo_workflow};
use flowcanvas_editor::config::EditorConfig;
use flowcanvas_editor::error::EditorError;
use flowcanvas_execution::{OrderStrategyKind, SeededRandom, VirtualClock};
use flowcanvas_store::LogFilter;
use flowcanvas_workflow::{
    BuiltinNodeTypes, ExecutionRecord, ExecutionStatus, JsonFileWorkflowStore, NodeTypeRegistry,
    WorkflowStore, import_workflow,
};
use rootcause::Report;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderCli {
    Collection,
    Topological,
}

impl From<OrderCli> for OrderStrategyKind {
    fn from(order: OrderCli) -> Self {
        match order {
            OrderCli::Collection => Self::Collection,
            OrderCli::Topological => Self::Topological,
        }
    }
}

/// Load a workflow, run it through the simulator, and export the results
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, JSON, or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workflow JSON to import; a demo workflow is used otherwise
    #[arg(short, long)]
    workflow: Option<PathBuf>,

    /// Seed for reproducible delays and failures
    #[arg(long)]
    seed: Option<u64>,

    /// Node visiting order
    #[arg(long, value_enum)]
    order: Option<OrderCli>,

    /// Skip real waiting; timestamps still reflect simulated delays
    #[arg(long)]
    virtual_time: bool,

    /// Retry a failed run up to this many times
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Write the log store as JSON
    #[arg(long)]
    export_logs: Option<PathBuf>,

    /// Write the execution history as JSON
    #[arg(long)]
    export_history: Option<PathBuf>,

    /// Save the workflow into this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(ExecutionStatus::Success) => ExitCode::SUCCESS,
        Ok(status) => {
            tracing::warn!(%status, "workflow did not succeed");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "editor failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExecutionStatus, Report<EditorError>> {
    let mut config = EditorConfig::load(cli.config.as_deref())?;
    if let Some(order) = cli.order {
        config.simulator.order = order.into();
    }
    tracing::info!(order = %config.simulator.order, "loaded configuration");

    let registry: Arc<dyn NodeTypeRegistry> = Arc::new(BuiltinNodeTypes::default());
    let workflow = match &cli.workflow {
        Some(path) => {
            let data = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| EditorError::Import {
                    path: path.clone(),
                    details: e.to_string(),
                })?;
            import_workflow(&data).map_err(|e| EditorError::Import {
                path: path.clone(),
                details: e.to_string(),
            })?
        }
        None => demo_workflow(registry.as_ref()).map_err(|e| EditorError::Import {
            path: PathBuf::from("<demo>"),
            details: e.to_string(),
        })?,
    };

    for issue in workflow.graph.validation_issues() {
        tracing::warn!(%issue, "workflow has a validation issue");
    }

    let mut app = EditorApp::init(&config, workflow, registry);
    if let Some(seed) = cli.seed {
        app.set_random(Arc::new(SeededRandom::new(seed)));
    }
    if cli.virtual_time {
        app.set_clock(Arc::new(VirtualClock::new(Utc::now())));
    }

    app.canvas_mut()
        .fit_to_graph(config.screen.width, config.screen.height);
    tracing::info!(
        zoom = app.canvas().viewport().zoom,
        connections = app.canvas().routed_connections().len(),
        "fitted canvas to graph"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let mut record = app
        .run(cancel.clone())
        .await
        .map_err(|e| EditorError::Simulation {
            details: e.to_string(),
        })?;
    let mut attempts = 0;
    while record.status == ExecutionStatus::Error && attempts < cli.retries {
        attempts += 1;
        tracing::info!(attempt = attempts, "retrying failed run");
        record = app
            .retry(&record, cancel.clone())
            .await
            .map_err(|e| EditorError::Simulation {
                details: e.to_string(),
            })?;
    }
    print_summary(&record);

    if let Some(path) = &cli.export_logs {
        let json = app
            .logs()
            .export_json(&LogFilter::default())
            .map_err(|e| EditorError::Export {
                path: path.clone(),
                details: e.to_string(),
            })?;
        write_export(path, &json).await?;
    }

    if let Some(path) = &cli.export_history {
        let records = app.history().list(&Default::default());
        let json = serde_json::to_string_pretty(&records).map_err(|e| EditorError::Export {
            path: path.clone(),
            details: e.to_string(),
        })?;
        write_export(path, &json).await?;
    }

    if let Some(dir) = &cli.save_dir {
        let store = JsonFileWorkflowStore::new(dir);
        let workflow = app.workflow();
        store
            .save(&workflow)
            .await
            .map_err(|e| EditorError::Persistence {
                details: e.to_string(),
            })?;
        tracing::info!(workflow = %workflow.id, dir = %dir.display(), "saved workflow");
    }

    let status = record.status;
    app.dispose();
    Ok(status)
}

async fn write_export(path: &Path, contents: &str) -> Result<(), Report<EditorError>> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| EditorError::Export {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
    tracing::info!(path = %path.display(), "export written");
    Ok(())
}

fn print_summary(record: &ExecutionRecord) {
    println!(
        "{} [{}] {} in {} ms",
        record.workflow_name,
        record.id,
        record.status,
        record.duration().map_or(0, |d| d.num_milliseconds())
    );
    for node in &record.node_executions {
        println!(
            "  {:<24} {:<10?} {:>6} ms",
            node.node_name,
            node.status,
            node.duration_ms().unwrap_or_default()
        );
    }
    if let Some(error) = &record.error {
        println!("  error: {error}");
    }
}
