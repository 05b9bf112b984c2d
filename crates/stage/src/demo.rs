//! A synthetic keyboard built in code, for the CLI and tests.
//!
//! Keycaps sit on a board with their tops at `y = 2`, named the way the
//! shipped model names them. The Python key is placed on the focus point, so
//! the centre of the focused view lands on it.

use glam::Vec3;
use keyscape_common::Transform;
use keyscape_scene::{Material, Mesh, Node, SceneError, SceneGraph};

const CAP_HALF: Vec3 = Vec3::new(0.9, 0.4, 0.9);
const LEGEND_HALF: Vec3 = Vec3::new(0.5, 0.02, 0.5);
const CAP_Y: f32 = 1.6;

/// Single-mesh keycaps: `(node name, x, z)`.
const CAPS: &[(&str, f32, f32)] = &[
    ("Key-HTML5018", -8.0, -4.0),
    ("Key-CSS026", -6.0, -4.0),
    ("Key-Typescript028", -4.0, -4.0),
    ("Key-React029", -2.0, -4.0),
    ("Key-Javascript021", 0.0, -4.0),
    ("Key-Github017", 2.0, -4.0),
    ("Key-Java016", -6.0, -2.0),
    ("Key-Unity019", -2.0, -2.0),
    ("Key-CSharp020", 0.0, -2.0),
    // Blank cap, not bound to anything.
    ("Cube040", 2.0, -2.0),
];

fn keycap_material() -> Material {
    Material {
        name: "keycap".into(),
        base_color: [0.15, 0.15, 0.17, 1.0],
        ..Material::default()
    }
}

/// A cap split into body and legend sub-meshes under a group node.
fn split_cap(
    scene: &mut SceneGraph,
    parent: keyscape_common::NodeId,
    group: &str,
    body: &str,
    legend: &str,
    at: Vec3,
) -> Result<(), SceneError> {
    let group = scene.add(parent, Node::new(group).with_transform(Transform::from_position(at)))?;
    scene.add(
        group,
        Node::new(body)
            .with_mesh(Mesh::cuboid(CAP_HALF))
            .with_material(keycap_material()),
    )?;
    scene.add(
        group,
        Node::new(legend)
            .with_transform(Transform::from_position(Vec3::new(0.0, CAP_HALF.y, 0.0)))
            .with_mesh(Mesh::cuboid(LEGEND_HALF))
            .with_material(keycap_material()),
    )?;
    Ok(())
}

pub fn demo_keyboard() -> Result<SceneGraph, SceneError> {
    let mut scene = SceneGraph::with_root(Node::new("Keyboard"));
    let root = scene.root();

    scene.add(
        root,
        Node::new("Case")
            .with_transform(Transform::from_position(Vec3::new(-3.0, 0.6, -3.0)))
            .with_mesh(Mesh::cuboid(Vec3::new(6.5, 0.6, 2.5)))
            .with_material(Material {
                name: "case".into(),
                base_color: [0.05, 0.05, 0.05, 1.0],
                emissive: None,
            }),
    )?;

    for &(name, x, z) in CAPS {
        scene.add(
            root,
            Node::new(name)
                .with_transform(Transform::from_position(Vec3::new(x, CAP_Y, z)))
                .with_mesh(Mesh::cuboid(CAP_HALF))
                .with_material(keycap_material()),
        )?;
    }
    split_cap(&mut scene, root, "Cube021", "Cube021_1", "Cube021_2", Vec3::new(-8.0, CAP_Y, -2.0))?;
    split_cap(
        &mut scene,
        root,
        "Key-Python022",
        "Cube035_1",
        "Cube035_2",
        Vec3::new(-4.0, CAP_Y, -2.0),
    )?;
    Ok(scene)
}
