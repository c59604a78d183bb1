//! Connection routing and hit testing.
//!
//! Port anchors and connection curves are pure functions of the graph and
//! the viewport. Curves are cubic beziers whose control points sit
//! horizontally outward from the source and inward to the target, so a
//! connection reads as a horizontal S-curve even when the target is left of
//! the source.

use crate::viewport::{Viewport, node_bounds};
use flowcanvas_core::{ConnectionId, NodeId};
use flowcanvas_workflow::{Connection, Node, Point, WorkflowGraph};
use std::fmt::Write as _;

/// Logical node width.
pub const NODE_WIDTH: f64 = 160.0;
/// Logical node height.
pub const NODE_HEIGHT: f64 = 60.0;
/// Logical radius of a port handle.
pub const PORT_RADIUS: f64 = 6.0;
/// Hit band around a curve, in screen pixels. The rendered stroke is 2px.
pub const HIT_TOLERANCE: f64 = 5.0;
/// Polyline resolution used to measure distance to a curve.
pub const CURVE_SEGMENTS: usize = 32;

/// Vertical offset of port `index` out of `count` on one side of a node.
#[must_use]
pub fn port_offset(index: usize, count: usize) -> f64 {
    NODE_HEIGHT * (index as f64 + 1.0) / (count as f64 + 1.0)
}

/// Logical anchor of a port, or `None` if the node has no such port on that
/// side.
#[must_use]
pub fn port_logical_position(node: &Node, port_id: &str, is_output: bool) -> Option<Point> {
    let ports = if is_output { &node.outputs } else { &node.inputs };
    let index = ports.iter().position(|p| p.id == port_id)?;
    let x = if is_output { NODE_WIDTH } else { 0.0 };
    Some(node.position + Point::new(x, port_offset(index, ports.len())))
}

/// Screen anchor of a port: outputs on the right edge, inputs on the left.
#[must_use]
pub fn port_screen_position(
    node: &Node,
    port_id: &str,
    is_output: bool,
    viewport: &Viewport,
) -> Option<Point> {
    port_logical_position(node, port_id, is_output).map(|p| viewport.to_screen(p))
}

/// A cubic bezier segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

/// Builds the curve for a connection from `start` (output) to `end` (input).
#[must_use]
pub fn curve_path(start: Point, end: Point) -> CurvePath {
    let offset = 0.5 * (end.x - start.x).abs();
    CurvePath {
        start,
        control1: Point::new(start.x + offset, start.y),
        control2: Point::new(end.x - offset, end.y),
        end,
    }
}

impl CurvePath {
    /// Evaluates the curve at `t` in `[0, 1]`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        self.start * (u * u * u)
            + self.control1 * (3.0 * u * u * t)
            + self.control2 * (3.0 * u * t * t)
            + self.end * (t * t * t)
    }

    /// Samples `segments + 1` evenly spaced points, endpoints included.
    #[must_use]
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }

    /// SVG path data (`M x y C ...`).
    #[must_use]
    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        let _ = write!(
            d,
            "M {} {} C {} {} {} {} {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        );
        d
    }

    /// Distance from `point` to the curve, measured against a
    /// [`CURVE_SEGMENTS`]-segment polyline.
    #[must_use]
    pub fn distance_to(&self, point: Point) -> f64 {
        self.sample(CURVE_SEGMENTS)
            .windows(2)
            .map(|w| distance_to_segment(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// A connection with its screen-space curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedConnection {
    pub connection: Connection,
    pub path: CurvePath,
}

impl RoutedConnection {
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.connection.id
    }
}

/// Computes screen curves for every connection, in collection order.
#[must_use]
pub fn route_connections(graph: &WorkflowGraph, viewport: &Viewport) -> Vec<RoutedConnection> {
    graph
        .connections()
        .iter()
        .filter_map(|connection| {
            let source = graph.node(connection.source_node_id)?;
            let target = graph.node(connection.target_node_id)?;
            let start = port_screen_position(source, &connection.source_port_id, true, viewport)?;
            let end = port_screen_position(target, &connection.target_port_id, false, viewport)?;
            Some(RoutedConnection {
                connection: connection.clone(),
                path: curve_path(start, end),
            })
        })
        .collect()
}

/// Returns the curve nearest to `point` within [`HIT_TOLERANCE`].
#[must_use]
pub fn hit_test_connection(point: Point, routed: &[RoutedConnection]) -> Option<&RoutedConnection> {
    hit_test_connection_within(point, routed, HIT_TOLERANCE)
}

/// Returns the curve nearest to `point` within `tolerance` screen pixels.
#[must_use]
pub fn hit_test_connection_within(
    point: Point,
    routed: &[RoutedConnection],
    tolerance: f64,
) -> Option<&RoutedConnection> {
    routed
        .iter()
        .map(|r| (r, r.path.distance_to(point)))
        .filter(|(_, d)| *d <= tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| r)
}

/// Returns the topmost node whose body contains the screen point. Later
/// nodes in collection order paint on top.
#[must_use]
pub fn hit_test_node<'a>(graph: &'a WorkflowGraph, viewport: &Viewport, point: Point) -> Option<&'a Node> {
    let logical = viewport.to_logical(point);
    graph
        .nodes()
        .iter()
        .rev()
        .find(|node| node_bounds(node).contains(logical))
}

/// A port under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortHit {
    pub node_id: NodeId,
    pub port_id: String,
    pub is_output: bool,
}

/// Returns the port handle under the screen point, checking nodes topmost
/// first. A handle is hit within its zoomed radius plus `tolerance`.
#[must_use]
pub fn hit_test_port(
    graph: &WorkflowGraph,
    viewport: &Viewport,
    point: Point,
    tolerance: f64,
) -> Option<PortHit> {
    let reach = PORT_RADIUS * viewport.zoom + tolerance;
    graph.nodes().iter().rev().find_map(|node| {
        let sides = [(true, &node.outputs), (false, &node.inputs)];
        sides.into_iter().find_map(|(is_output, ports)| {
            ports.iter().find_map(|port| {
                let anchor = port_screen_position(node, &port.id, is_output, viewport)?;
                (anchor.distance(point) <= reach).then(|| PortHit {
                    node_id: node.id,
                    port_id: port.id.clone(),
                    is_output,
                })
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcanvas_workflow::{BuiltinNodeTypes, PortRef};

    const EPS: f64 = 1e-9;

    fn wired() -> (WorkflowGraph, NodeId, NodeId) {
        let registry = BuiltinNodeTypes::default();
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(&registry, "webhook", Point::new(0.0, 0.0)).unwrap().id;
        let b = graph.add_node(&registry, "if", Point::new(400.0, 200.0)).unwrap().id;
        graph
            .add_connection(PortRef::new(a, "trigger"), PortRef::new(b, "input"))
            .unwrap();
        (graph, a, b)
    }

    #[test]
    fn single_port_sits_at_mid_height() {
        let (graph, a, b) = wired();
        let v = Viewport::default();
        let out = port_screen_position(graph.node(a).unwrap(), "trigger", true, &v).unwrap();
        assert_eq!(out, Point::new(NODE_WIDTH, NODE_HEIGHT / 2.0));
        let input = port_screen_position(graph.node(b).unwrap(), "input", false, &v).unwrap();
        assert_eq!(input, Point::new(400.0, 200.0 + NODE_HEIGHT / 2.0));
    }

    #[test]
    fn multiple_ports_spread_evenly() {
        let (graph, _, b) = wired();
        let node = graph.node(b).unwrap();
        let v = Viewport::default();
        let t = port_screen_position(node, "true", true, &v).unwrap();
        let f = port_screen_position(node, "false", true, &v).unwrap();
        assert!((t.y - (200.0 + 20.0)).abs() < EPS);
        assert!((f.y - (200.0 + 40.0)).abs() < EPS);
        assert!(port_screen_position(node, "true", false, &v).is_none());
    }

    #[test]
    fn port_position_follows_viewport() {
        let (graph, a, _) = wired();
        let v = Viewport {
            zoom: 2.0,
            pan: Point::new(10.0, 20.0),
        };
        let out = port_screen_position(graph.node(a).unwrap(), "trigger", true, &v).unwrap();
        assert_eq!(out, Point::new(NODE_WIDTH * 2.0 + 10.0, NODE_HEIGHT + 20.0));
    }

    #[test]
    fn control_points_offset_by_half_dx() {
        let path = curve_path(Point::new(100.0, 0.0), Point::new(300.0, 50.0));
        assert_eq!(path.control1, Point::new(200.0, 0.0));
        assert_eq!(path.control2, Point::new(200.0, 50.0));

        // Target left of source still bows outward from the source.
        let back = curve_path(Point::new(300.0, 0.0), Point::new(100.0, 50.0));
        assert_eq!(back.control1, Point::new(400.0, 0.0));
        assert_eq!(back.control2, Point::new(0.0, 50.0));
    }

    #[test]
    fn curve_endpoints_and_svg() {
        let path = curve_path(Point::new(0.0, 0.0), Point::new(100.0, 40.0));
        assert_eq!(path.point_at(0.0), path.start);
        assert_eq!(path.point_at(1.0), path.end);
        assert_eq!(path.sample(32).len(), 33);
        assert!(path.to_svg_path().starts_with("M 0 0 C 50 0"));
    }

    #[test]
    fn hit_test_uses_tolerance_band() {
        let (graph, _, _) = wired();
        let routed = route_connections(&graph, &Viewport::default());
        assert_eq!(routed.len(), 1);

        let mid = routed[0].path.point_at(0.5);
        assert!(hit_test_connection(mid, &routed).is_some());
        assert!(hit_test_connection(mid + Point::new(0.0, 4.0), &routed).is_some());
        assert!(hit_test_connection(mid + Point::new(0.0, 30.0), &routed).is_none());
    }

    #[test]
    fn hit_test_prefers_nearest_curve() {
        let a = RoutedConnection {
            connection: Connection::new(PortRef::new(NodeId::new(), "o"), PortRef::new(NodeId::new(), "i")),
            path: curve_path(Point::new(0.0, 0.0), Point::new(100.0, 0.0)),
        };
        let b = RoutedConnection {
            connection: Connection::new(PortRef::new(NodeId::new(), "o"), PortRef::new(NodeId::new(), "i")),
            path: curve_path(Point::new(0.0, 6.0), Point::new(100.0, 6.0)),
        };
        let routed = vec![a, b];
        let hit = hit_test_connection(Point::new(50.0, 4.0), &routed).unwrap();
        assert_eq!(hit.id(), routed[1].id());
    }

    #[test]
    fn node_and_port_hit_testing() {
        let (graph, a, b) = wired();
        let v = Viewport::default();
        assert_eq!(hit_test_node(&graph, &v, Point::new(80.0, 30.0)).map(|n| n.id), Some(a));
        assert!(hit_test_node(&graph, &v, Point::new(300.0, 30.0)).is_none());

        let port = hit_test_port(&graph, &v, Point::new(NODE_WIDTH + 3.0, 30.0), HIT_TOLERANCE).unwrap();
        assert_eq!(port, PortHit { node_id: a, port_id: "trigger".into(), is_output: true });

        let port = hit_test_port(&graph, &v, Point::new(401.0, 230.0), HIT_TOLERANCE).unwrap();
        assert_eq!(port.node_id, b);
        assert!(!port.is_output);
    }
}
