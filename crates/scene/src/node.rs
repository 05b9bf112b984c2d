use glam::Vec3;
use keyscape_common::{Aabb, NodeId, Rgb, Transform};
use serde::{Deserialize, Serialize};

/// Pickable geometry attached to a node, in the node's local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub bounds: Option<Aabb>,
    /// Triangle soup. Empty when only bounds were imported.
    pub triangles: Vec<[Vec3; 3]>,
}

impl Mesh {
    /// A box mesh, bounds only.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            bounds: Some(Aabb::from_half_extents(half_extents)),
            triangles: Vec::new(),
        }
    }

    /// A mesh from triangles; bounds are derived from the vertices.
    pub fn from_triangles(triangles: Vec<[Vec3; 3]>) -> Self {
        let bounds = Aabb::from_points(triangles.iter().flatten().copied());
        Self { bounds, triangles }
    }

    pub fn has_triangles(&self) -> bool {
        !self.triangles.is_empty()
    }
}

/// Surface description. `emissive` is the highlightable property: nodes
/// whose material carries none cannot be highlighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub emissive: Option<Rgb>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            emissive: Some(Rgb::BLACK),
        }
    }
}

/// Light sources. Directional lights shine from the node's position toward
/// the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Light {
    Ambient { intensity: f32 },
    Directional { intensity: f32 },
}

/// A named node in the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub material: Option<Material>,
    pub light: Option<Light>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::default(),
            mesh: None,
            material: None,
            light: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = Some(light);
        self
    }

    pub fn is_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Current highlightable colour, if the node has one.
    pub fn emissive(&self) -> Option<Rgb> {
        self.material.as_ref().and_then(|m| m.emissive)
    }
}
