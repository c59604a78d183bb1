//! Viewport transform between logical canvas space and screen space.
//!
//! `screen = logical * zoom + pan`. The viewport is session state; it is
//! never persisted with a workflow.

use crate::config::CanvasConfig;
use crate::router::{NODE_HEIGHT, NODE_WIDTH};
use flowcanvas_workflow::{Node, Point};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub fn from_origin_size(origin: Point, width: f64, height: f64) -> Self {
        Self {
            min: origin,
            max: Point::new(origin.x + width, origin.y + height),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        (self.min + self.max) / 2.0
    }

    /// Returns true if `point` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// Logical bounds of a node.
#[must_use]
pub fn node_bounds(node: &Node) -> Rect {
    Rect::from_origin_size(node.position, NODE_WIDTH, NODE_HEIGHT)
}

/// Logical bounds of all nodes, or `None` for an empty slice.
#[must_use]
pub fn graph_bounds(nodes: &[Node]) -> Option<Rect> {
    nodes
        .iter()
        .map(node_bounds)
        .reduce(|acc, rect| acc.union(&rect))
}

/// Zoom and pan of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Scale factor, always positive.
    pub zoom: f64,
    /// Screen-space translation.
    pub pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ZERO,
        }
    }
}

/// Maps a logical point to screen space.
#[must_use]
pub fn screen_from_logical(point: Point, viewport: &Viewport) -> Point {
    point * viewport.zoom + viewport.pan
}

/// Maps a screen point to logical space.
#[must_use]
pub fn logical_from_screen(point: Point, viewport: &Viewport) -> Point {
    (point - viewport.pan) / viewport.zoom
}

impl Viewport {
    /// Creates a viewport. The zoom is clamped to the configured bounds.
    #[must_use]
    pub fn new(zoom: f64, pan: Point, config: &CanvasConfig) -> Self {
        Self {
            zoom: config.clamp_zoom(zoom),
            pan,
        }
    }

    /// See [`screen_from_logical`].
    #[must_use]
    pub fn to_screen(&self, point: Point) -> Point {
        screen_from_logical(point, self)
    }

    /// See [`logical_from_screen`].
    #[must_use]
    pub fn to_logical(&self, point: Point) -> Point {
        logical_from_screen(point, self)
    }

    /// Multiplies the zoom by one step. Pan is unchanged.
    pub fn zoom_in(&mut self, config: &CanvasConfig) {
        self.zoom = config.clamp_zoom(self.zoom * config.zoom_step);
    }

    /// Divides the zoom by one step. Pan is unchanged.
    pub fn zoom_out(&mut self, config: &CanvasConfig) {
        self.zoom = config.clamp_zoom(self.zoom / config.zoom_step);
    }

    /// Scales the zoom by `factor` while keeping the logical point under the
    /// screen point `anchor` fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point, config: &CanvasConfig) {
        let logical = self.to_logical(anchor);
        self.zoom = config.clamp_zoom(self.zoom * factor);
        self.pan = anchor - logical * self.zoom;
    }

    /// Returns to zoom 1 and no pan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Computes a viewport that shows every node inside a screen area of
    /// `width` × `height`, centered, with `config.fit_padding` margin.
    ///
    /// An empty graph yields the default viewport.
    #[must_use]
    pub fn fit_to_graph(nodes: &[Node], width: f64, height: f64, config: &CanvasConfig) -> Self {
        let Some(bounds) = graph_bounds(nodes) else {
            return Self::default();
        };

        let available_w = (width - 2.0 * config.fit_padding).max(1.0);
        let available_h = (height - 2.0 * config.fit_padding).max(1.0);
        let zoom = config.clamp_zoom((available_w / bounds.width()).min(available_h / bounds.height()));

        let screen_center = Point::new(width / 2.0, height / 2.0);
        Self {
            zoom,
            pan: screen_center - bounds.center() * zoom,
        }
    }
}
