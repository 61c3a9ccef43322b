use serde::{Deserialize, Serialize};

use crate::shared::geometry::{Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Paint style; `width` is the stroke width, point diameter or text size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

impl Stroke {
    pub const fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// Host-provided canvas in surface pixel coordinates.
pub trait DrawingSurface {
    /// Current `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);

    fn clear(&mut self);

    fn draw_rect(&mut self, rect: Rect, stroke: &Stroke);

    fn draw_point(&mut self, point: Point, stroke: &Stroke);

    /// Connects consecutive points; does not close the shape.
    fn draw_polyline(&mut self, points: &[Point], stroke: &Stroke);

    fn draw_text(&mut self, position: Point, text: &str, stroke: &Stroke);
}
