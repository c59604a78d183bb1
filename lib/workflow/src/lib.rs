//! Workflow model for the flowcanvas editor.
//!
//! This crate provides the authoritative workflow graph and everything that
//! describes it:
//!
//! - **Graph Model**: Nodes and connections in collection order, with
//!   petgraph-backed validation and topological ordering
//! - **Port System**: Typed input/output ports with kind compatibility
//! - **Commands**: A reducer interface and a shared [`GraphHandle`]
//! - **Registry**: Node-type templates and simulated outputs
//! - **Execution Records**: Run and per-node records plus progress events
//! - **Persistence**: The [`WorkflowStore`] trait and two implementations

pub mod command;
pub mod connection;
pub mod definition;
pub mod error;
pub mod execution;
pub mod graph;
pub mod node;
pub mod persistence;
pub mod port;
pub mod registry;

pub use command::{CommandOutcome, GraphChange, GraphCommand, GraphHandle};
pub use connection::{Connection, PortRef};
pub use definition::{Workflow, WorkflowMetadata, WorkflowSummary};
pub use error::{GraphError, InvalidConnection, StoreError};
pub use execution::{
    ExecutionEvent, ExecutionMode, ExecutionRecord, ExecutionStatus, NodeExecutionRecord,
    NodeExecutionStatus,
};
pub use graph::{DeletedNode, WorkflowGraph};
pub use node::{Node, NodeStatus, Point};
pub use persistence::{
    ExportFormat, InMemoryWorkflowStore, JsonFileWorkflowStore, StoreResult, WorkflowStore,
    export_workflow, import_workflow,
};
pub use port::{Port, PortKind};
pub use registry::{BuiltinNodeTypes, MockOutputFn, NodeCategory, NodeTypeDefinition, NodeTypeRegistry};
