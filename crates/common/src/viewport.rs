use glam::Vec2;
use serde::{Deserialize, Serialize};

/// The bounding rectangle of the 3D view, in the same coordinate space as
/// the pointer events delivered to it.
///
/// All screen → NDC conversions go through this rectangle. Mixing display
/// dimensions with view-relative pointer coordinates shifts every ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A viewport anchored at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.width / self.height
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.left + self.width * 0.5,
            self.top + self.height * 0.5,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }

    /// Normalized device coordinates of a screen point: `(0, 0)` at the
    /// centre, `x` to the right, `y` up, `[-1, 1]` on both axes inside the
    /// viewport. `None` for degenerate viewports or points outside it.
    pub fn to_ndc(&self, point: Vec2) -> Option<Vec2> {
        if self.is_degenerate() || !self.contains(point) {
            return None;
        }
        Some(Vec2::new(
            ((point.x - self.left) / self.width) * 2.0 - 1.0,
            -((point.y - self.top) / self.height) * 2.0 + 1.0,
        ))
    }

    /// Inverse of [`Viewport::to_ndc`].
    pub fn from_ndc(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            self.left + (ndc.x + 1.0) * 0.5 * self.width,
            self.top + (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}
