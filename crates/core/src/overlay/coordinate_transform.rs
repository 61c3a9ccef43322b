//! Maps detector image coordinates onto the drawing surface.
//!
//! Each axis scales independently (scale-to-fill, aspect ratio not kept),
//! matching a preview stretched over the whole surface. Front cameras show a
//! mirrored preview, so x is flipped around the surface width.

use crate::overlay::overlay_state::{CameraFacing, PreviewGeometry};
use crate::shared::geometry::{Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransform {
    scale_x: f32,
    scale_y: f32,
    surface_width: f32,
    mirrored: bool,
}

impl CoordinateTransform {
    /// Returns `None` when either preview dimension is zero.
    pub fn new(
        preview: PreviewGeometry,
        surface: (u32, u32),
        facing: CameraFacing,
    ) -> Option<Self> {
        if preview.width == 0 || preview.height == 0 {
            return None;
        }
        let surface_width = surface.0 as f32;
        Some(Self {
            scale_x: surface_width / preview.width as f32,
            scale_y: surface.1 as f32 / preview.height as f32,
            surface_width,
            mirrored: facing == CameraFacing::Front,
        })
    }

    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn map_x(&self, x: f32) -> f32 {
        let scaled = x * self.scale_x;
        if self.mirrored {
            self.surface_width - scaled
        } else {
            scaled
        }
    }

    pub fn map_y(&self, y: f32) -> f32 {
        y * self.scale_y
    }

    pub fn map_point(&self, point: Point) -> Point {
        Point::new(self.map_x(point.x), self.map_y(point.y))
    }

    pub fn map_points(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|&p| self.map_point(p)).collect()
    }

    /// Mirroring swaps left and right; the result is re-normalized.
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let [top_left, _, bottom_right, _] = rect.corners();
        Rect::from_corners(self.map_point(top_left), self.map_point(bottom_right))
    }
}
