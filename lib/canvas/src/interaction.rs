//! Pointer-driven canvas state machine.
//!
//! The engine turns pointer events into graph commands and viewport changes.
//! Exactly one gesture is active at a time; a pointer-down while a gesture is
//! in progress is ignored until the gesture resolves. Zoom and view resets
//! are independent of the gesture state.

use crate::config::CanvasConfig;
use crate::router::{self, CurvePath, PortHit, RoutedConnection};
use crate::viewport::Viewport;
use flowcanvas_core::{ConnectionId, NodeId};
use flowcanvas_workflow::{
    CommandOutcome, Connection, GraphCommand, GraphError, GraphHandle, Point, PortRef,
    WorkflowGraph,
};
use tracing::debug;

/// The active gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasState {
    Idle,
    /// A node follows the pointer. `pointer_offset` is the screen distance
    /// from the node's top-left corner to the pointer at grab time.
    DraggingNode {
        node_id: NodeId,
        pointer_offset: Point,
    },
    /// The viewport follows the pointer.
    PanningCanvas { last_point: Point },
    /// A rubber-band connection is being drawn from an output port.
    DrawingConnection {
        source_node_id: NodeId,
        source_port_id: String,
        origin: Point,
        current: Point,
    },
}

/// What is currently selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Node(NodeId),
    Connection(ConnectionId),
}

/// Observable result of a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// The event had no effect.
    Ignored,
    DragStarted { node_id: NodeId },
    NodeMoved { node_id: NodeId, position: Point },
    DragEnded { node_id: NodeId },
    PanStarted,
    Panned { pan: Point },
    PanEnded,
    ConnectionStarted { source: PortRef },
    RubberBandMoved { current: Point },
    ConnectionCreated(Connection),
    /// The graph refused the connection; nothing changed.
    ConnectionRejected(GraphError),
    ConnectionAborted,
    ConnectionSelected { connection_id: ConnectionId },
}

/// Canvas interaction engine bound to one graph.
#[derive(Debug)]
pub struct CanvasEngine {
    graph: GraphHandle,
    config: CanvasConfig,
    viewport: Viewport,
    state: CanvasState,
    selection: Option<Selection>,
}

impl CanvasEngine {
    /// Creates an idle engine with the default viewport.
    #[must_use]
    pub fn new(graph: GraphHandle, config: CanvasConfig) -> Self {
        Self {
            graph,
            config,
            viewport: Viewport::default(),
            state: CanvasState::Idle,
            selection: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    #[must_use]
    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    /// Screen curves for every connection under the current viewport.
    #[must_use]
    pub fn routed_connections(&self) -> Vec<RoutedConnection> {
        self.graph
            .read(|g| router::route_connections(g, &self.viewport))
    }

    /// The transient curve of the connection being drawn, if any.
    #[must_use]
    pub fn rubber_band(&self) -> Option<CurvePath> {
        match &self.state {
            CanvasState::DrawingConnection {
                origin, current, ..
            } => Some(router::curve_path(*origin, *current)),
            _ => None,
        }
    }

    fn port_at(&self, graph: &WorkflowGraph, point: Point) -> Option<PortHit> {
        router::hit_test_port(graph, &self.viewport, point, self.config.hit_tolerance)
    }

    /// Handles a pointer press at a screen point.
    ///
    /// Priority: output port, node body or input port, connection curve,
    /// background.
    pub fn pointer_down(&mut self, point: Point) -> CanvasEvent {
        if self.state != CanvasState::Idle {
            debug!(state = ?self.state, "pointer-down ignored during gesture");
            return CanvasEvent::Ignored;
        }

        let target = self.graph.read(|graph| {
            if let Some(hit) = self.port_at(graph, point).filter(|hit| hit.is_output) {
                let origin = router::port_screen_position(
                    graph.node(hit.node_id)?,
                    &hit.port_id,
                    true,
                    &self.viewport,
                )?;
                return Some(PressTarget::OutputPort(hit, origin));
            }
            if let Some(node) = router::hit_test_node(graph, &self.viewport, point) {
                let corner = self.viewport.to_screen(node.position);
                return Some(PressTarget::Node(node.id, point - corner));
            }
            if let Some(hit) = self.port_at(graph, point) {
                let node = graph.node(hit.node_id)?;
                let corner = self.viewport.to_screen(node.position);
                return Some(PressTarget::Node(node.id, point - corner));
            }
            let routed = router::route_connections(graph, &self.viewport);
            router::hit_test_connection_within(point, &routed, self.config.hit_tolerance)
                .map(|r| PressTarget::Connection(r.id()))
        });

        match target {
            Some(PressTarget::OutputPort(hit, origin)) => {
                debug!(node_id = %hit.node_id, port = %hit.port_id, "connection drawing started");
                let source = PortRef::new(hit.node_id, hit.port_id.clone());
                self.state = CanvasState::DrawingConnection {
                    source_node_id: hit.node_id,
                    source_port_id: hit.port_id,
                    origin,
                    current: point,
                };
                CanvasEvent::ConnectionStarted { source }
            }
            Some(PressTarget::Node(node_id, pointer_offset)) => {
                self.selection = Some(Selection::Node(node_id));
                self.state = CanvasState::DraggingNode {
                    node_id,
                    pointer_offset,
                };
                CanvasEvent::DragStarted { node_id }
            }
            Some(PressTarget::Connection(connection_id)) => {
                self.selection = Some(Selection::Connection(connection_id));
                CanvasEvent::ConnectionSelected { connection_id }
            }
            None => {
                self.selection = None;
                self.state = CanvasState::PanningCanvas { last_point: point };
                CanvasEvent::PanStarted
            }
        }
    }

    /// Handles pointer movement to a screen point.
    pub fn pointer_move(&mut self, point: Point) -> CanvasEvent {
        match &mut self.state {
            CanvasState::Idle => CanvasEvent::Ignored,
            CanvasState::DraggingNode {
                node_id,
                pointer_offset,
            } => {
                let node_id = *node_id;
                let position = (point - *pointer_offset - self.viewport.pan) / self.viewport.zoom;
                match self.graph.dispatch(GraphCommand::MoveNode { node_id, position }) {
                    Ok(_) => CanvasEvent::NodeMoved { node_id, position },
                    Err(err) => {
                        // The node disappeared under the pointer.
                        debug!(%node_id, error = %err, "drag target lost");
                        self.state = CanvasState::Idle;
                        CanvasEvent::DragEnded { node_id }
                    }
                }
            }
            CanvasState::PanningCanvas { last_point } => {
                self.viewport.pan = self.viewport.pan + (point - *last_point);
                *last_point = point;
                CanvasEvent::Panned {
                    pan: self.viewport.pan,
                }
            }
            CanvasState::DrawingConnection { current, .. } => {
                *current = point;
                CanvasEvent::RubberBandMoved { current: point }
            }
        }
    }

    /// Handles a pointer release at a screen point.
    pub fn pointer_up(&mut self, point: Point) -> CanvasEvent {
        match std::mem::replace(&mut self.state, CanvasState::Idle) {
            CanvasState::Idle => CanvasEvent::Ignored,
            CanvasState::DraggingNode { node_id, .. } => CanvasEvent::DragEnded { node_id },
            CanvasState::PanningCanvas { .. } => CanvasEvent::PanEnded,
            CanvasState::DrawingConnection {
                source_node_id,
                source_port_id,
                ..
            } => {
                let target = self
                    .graph
                    .read(|graph| self.port_at(graph, point))
                    .filter(|hit| !hit.is_output);
                let Some(target) = target else {
                    return CanvasEvent::ConnectionAborted;
                };
                let command = GraphCommand::AddConnection {
                    source: PortRef::new(source_node_id, source_port_id),
                    target: PortRef::new(target.node_id, target.port_id),
                };
                match self.graph.dispatch(command) {
                    Ok(CommandOutcome::ConnectionAdded(connection)) => {
                        debug!(connection_id = %connection.id, "connection created");
                        CanvasEvent::ConnectionCreated(connection)
                    }
                    Ok(_) => CanvasEvent::ConnectionAborted,
                    Err(err) => {
                        debug!(error = %err, "connection rejected");
                        CanvasEvent::ConnectionRejected(err)
                    }
                }
            }
        }
    }

    /// Abandons the active gesture. A drag keeps the position reached so far.
    pub fn cancel_gesture(&mut self) {
        self.state = CanvasState::Idle;
    }

    /// Deletes the selected node or connection.
    ///
    /// Returns `None` if nothing was selected.
    pub fn delete_selection(&mut self) -> Option<Result<CommandOutcome, GraphError>> {
        let command = match self.selection.take()? {
            Selection::Node(node_id) => GraphCommand::DeleteNode { node_id },
            Selection::Connection(connection_id) => {
                GraphCommand::DeleteConnection { connection_id }
            }
        };
        Some(self.graph.dispatch(command))
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(&self.config);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(&self.config);
    }

    /// Zooms by `factor` around the screen point `anchor`.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        self.viewport.zoom_at(factor, anchor, &self.config);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Frames every node inside a screen area of `width` × `height`.
    pub fn fit_to_graph(&mut self, width: f64, height: f64) {
        self.viewport = self
            .graph
            .read(|g| Viewport::fit_to_graph(g.nodes(), width, height, &self.config));
    }
}

enum PressTarget {
    OutputPort(PortHit, Point),
    Node(NodeId, Point),
    Connection(ConnectionId),
}
