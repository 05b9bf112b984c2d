use keyscape_common::NodeId;
use keyscape_scene::SceneGraph;
use std::fmt::Write;

use crate::camera::Camera;

/// Draws the keyboard scene from a camera.
///
/// A renderer reads the scene and the camera and produces output. It never
/// mutates the scene; highlight colours are already applied by the time a
/// frame is drawn.
pub trait Renderer {
    /// What a frame produces.
    type Output;

    /// Render one frame of the scene as seen from `camera`.
    fn render(&self, scene: &SceneGraph, camera: &Camera) -> Self::Output;
}

/// Debug text renderer, standing in for a GPU backend.
///
/// Lists every node of the keyboard scene as an indented outline. A keycap
/// flash shows up as a changed `emissive=` value.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }

    fn write_node(&self, out: &mut String, scene: &SceneGraph, id: NodeId, depth: usize) {
        let Some(node) = scene.get(id) else {
            return;
        };
        let p = node.transform.position;
        let _ = write!(
            out,
            "{:indent$}{} {} pos=({:.2}, {:.2}, {:.2})",
            "",
            id,
            node.name,
            p.x,
            p.y,
            p.z,
            indent = depth * 2
        );
        if node.is_mesh() {
            out.push_str(" mesh");
        }
        if let Some(color) = node.emissive() {
            let _ = write!(out, " emissive={color}");
        }
        if let Some(light) = &node.light {
            let _ = write!(out, " light={light:?}");
        }
        out.push('\n');
        for child in &node.children {
            self.write_node(out, scene, *child, depth + 1);
        }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &SceneGraph, camera: &Camera) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Scene ({} nodes) ===", scene.len());
        let (e, t) = (camera.position, camera.target);
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
            e.x,
            e.y,
            e.z,
            t.x,
            t.y,
            t.z,
            camera.fov_y.to_degrees()
        );
        self.write_node(&mut out, scene, scene.root(), 0);
        out
    }
}
