use glam::{Mat4, Vec2, Vec3};
use keyscape_common::Ray;

/// Perspective camera. The controller owns its placement; picking reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(20.0, 30.0, 25.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 55.0_f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray from the eye through a point in normalised device
    /// coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(self.position, (far - self.position).normalize_or_zero())
    }

    /// Normalised device coordinates of a world point.
    pub fn project(&self, point: Vec3) -> Vec2 {
        self.view_projection().project_point3(point).truncate()
    }
}
