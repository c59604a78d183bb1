//! Canvas engine for the flowcanvas editor.
//!
//! - **Viewport**: zoom/pan transform between logical and screen space
//! - **Router**: port anchors, bezier connection curves, and hit testing
//! - **Interaction**: the pointer state machine that issues graph commands

pub mod config;
pub mod error;
pub mod interaction;
pub mod router;
pub mod viewport;

pub use config::{CanvasConfig, MAX_ZOOM, MIN_ZOOM};
pub use error::CanvasConfigError;
pub use interaction::{CanvasEngine, CanvasEvent, CanvasState, Selection};
pub use router::{
    CurvePath, NODE_HEIGHT, NODE_WIDTH, PortHit, RoutedConnection, curve_path,
    hit_test_connection, hit_test_node, hit_test_port, port_screen_position, route_connections,
};
pub use viewport::{Rect, Viewport, logical_from_screen, screen_from_logical};
