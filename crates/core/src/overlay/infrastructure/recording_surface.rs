use crate::overlay::domain::drawing_surface::{DrawingSurface, Stroke};
use crate::shared::geometry::{Point, Rect};

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Rect(Rect, Stroke),
    Point(Point, Stroke),
    Polyline(Vec<Point>, Stroke),
    Text(Point, String),
}

/// In-memory surface that records the primitives painted since the last clear.
///
/// Used by the CLI to print a draw tick and by tests to inspect geometry.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
    clears: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            clears: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect(r, _) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn points(&self) -> Vec<Point> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Point(p, _) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn polylines(&self) -> Vec<Vec<Point>> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Polyline(points, _) => Some(points.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DrawingSurface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.clears += 1;
    }

    fn draw_rect(&mut self, rect: Rect, stroke: &Stroke) {
        self.ops.push(DrawOp::Rect(rect, *stroke));
    }

    fn draw_point(&mut self, point: Point, stroke: &Stroke) {
        self.ops.push(DrawOp::Point(point, *stroke));
    }

    fn draw_polyline(&mut self, points: &[Point], stroke: &Stroke) {
        self.ops.push(DrawOp::Polyline(points.to_vec(), *stroke));
    }

    fn draw_text(&mut self, position: Point, text: &str, _stroke: &Stroke) {
        self.ops.push(DrawOp::Text(position, text.to_string()));
    }
}
