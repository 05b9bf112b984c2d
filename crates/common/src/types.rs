use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Index of a node inside a scene graph arena.
///
/// Ids are never reused within one graph, so a stale id simply stops
/// resolving once its node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Local position, rotation and scale of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Decompose a column-major matrix. Shear is dropped.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// A packed `0xRRGGBB` colour, the representation used for emissive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);

    pub fn hex(self) -> u32 {
        self.0 & 0x00ff_ffff
    }

    /// Convert linear `[0, 1]` factors (as found in glTF materials).
    pub fn from_factors(factors: [f32; 3]) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        Self((channel(factors[0]) << 16) | (channel(factors[1]) << 8) | channel(factors[2]))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:06x}", self.hex())
    }
}
