use glam::Vec2;
use keyscape_common::{NodeId, Ray, Viewport};
use keyscape_keycaps::{KeycapRegistry, LogicalKey};
use keyscape_scene::SceneGraph;

use crate::camera::Camera;

/// Name lookup covers the hit node, its parent and its grandparent.
const NAME_LOOKUP_DEPTH: usize = 3;

/// The nearest node under a screen point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// `None` when neither the node nor its two nearest ancestors are
    /// registered keycaps.
    pub logical_key: Option<LogicalKey>,
    pub hit_node: NodeId,
    /// World units from the camera.
    pub distance: f32,
}

/// Cast a ray through `screen` and return the nearest mesh it hits.
///
/// `screen` is in the viewport's coordinate space. Points outside the
/// viewport, or a degenerate viewport, never hit. When `candidates` is
/// non-empty only those nodes are tested (their children are not);
/// otherwise every mesh node in the scene is.
pub fn hit_test(
    screen: Vec2,
    viewport: &Viewport,
    camera: &Camera,
    scene: &SceneGraph,
    candidates: &[NodeId],
    registry: &KeycapRegistry,
) -> Option<HitResult> {
    let ndc = viewport.to_ndc(screen)?;
    let mut camera = camera.clone();
    camera.aspect = viewport.aspect();
    let ray = camera.ray_from_ndc(ndc);

    let all_meshes;
    let targets = if candidates.is_empty() {
        all_meshes = scene.mesh_nodes(scene.root());
        &all_meshes[..]
    } else {
        candidates
    };

    let (hit_node, distance) = targets
        .iter()
        .filter_map(|&id| intersect_node(scene, id, &ray).map(|t| (id, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let logical_key = resolve_key(scene, hit_node, registry);
    tracing::debug!(
        node = %hit_node,
        name = scene.name(hit_node).unwrap_or_default(),
        distance,
        key = ?logical_key,
        "ray hit"
    );
    Some(HitResult {
        logical_key,
        hit_node,
        distance,
    })
}

/// Distance along a unit world-space ray to a node's mesh.
///
/// The ray is moved into the node's local space so bounds and triangles are
/// tested untransformed. The local direction is left unnormalised, which
/// keeps the parameter in world units.
pub fn intersect_node(scene: &SceneGraph, id: NodeId, ray: &Ray) -> Option<f32> {
    let mesh = scene.get(id)?.mesh.as_ref()?;
    let inverse = scene.world_matrix(id)?.inverse();
    if !inverse.is_finite() {
        return None;
    }
    let local = ray.transformed(&inverse);

    let slab = match &mesh.bounds {
        Some(bounds) => Some(bounds.intersect_ray(&local)?),
        None => None,
    };
    if mesh.has_triangles() {
        mesh.triangles
            .iter()
            .filter_map(|[a, b, c]| local.intersect_triangle(*a, *b, *c))
            .min_by(f32::total_cmp)
    } else {
        slab
    }
}

/// Registered key for a node, checking the node, its parent, then its
/// grandparent.
pub fn resolve_key(
    scene: &SceneGraph,
    id: NodeId,
    registry: &KeycapRegistry,
) -> Option<LogicalKey> {
    std::iter::once(id)
        .chain(scene.ancestors(id))
        .take(NAME_LOOKUP_DEPTH)
        .find_map(|n| scene.name(n).and_then(|name| registry.resolve(name)))
}

/// Mesh nodes under `from` whose own name is a registered keycap.
pub fn keycap_candidates(
    scene: &SceneGraph,
    from: NodeId,
    registry: &KeycapRegistry,
) -> Vec<NodeId> {
    scene
        .mesh_nodes(from)
        .into_iter()
        .filter(|id| scene.name(*id).is_some_and(|name| registry.contains(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use keyscape_common::Transform;
    use keyscape_scene::{Material, Mesh, Node};

    fn front_camera() -> Camera {
        Camera {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            ..Camera::default()
        }
    }

    fn keycap(name: &str, at: Vec3) -> Node {
        Node::new(name)
            .with_transform(Transform::from_position(at))
            .with_mesh(Mesh::cuboid(Vec3::splat(0.5)))
            .with_material(Material::default())
    }

    fn screen_of(point: Vec3, camera: &Camera, viewport: &Viewport) -> Vec2 {
        let mut camera = camera.clone();
        camera.aspect = viewport.aspect();
        viewport.from_ndc(camera.project(point))
    }

    #[test]
    fn centre_tap_hits_registered_key() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let key = scene.add(root, keycap("Key-Python022", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        let viewport = Viewport::sized(400.0, 300.0);

        let hit = hit_test(
            viewport.center(),
            &viewport,
            &front_camera(),
            &scene,
            &[],
            &registry,
        )
        .unwrap();
        assert_eq!(hit.hit_node, key);
        assert_eq!(hit.logical_key, Some(LogicalKey::Python));
        assert!((hit.distance - 9.5).abs() < 1e-3);
    }

    #[test]
    fn ndc_is_relative_to_viewport_not_display() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        scene.add(root, keycap("Key_Java", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        // A view inset into a 400x200 display.
        let viewport = Viewport::new(100.0, 50.0, 200.0, 100.0);
        let cam = front_camera();

        let hit = hit_test(Vec2::new(200.0, 100.0), &viewport, &cam, &scene, &[], &registry);
        assert_eq!(hit.unwrap().logical_key, Some(LogicalKey::Java));

        // Display centre lands on the view's corner.
        let display_centre =
            hit_test(Vec2::new(100.0, 50.0), &viewport, &cam, &scene, &[], &registry);
        assert!(display_centre.is_none());
    }

    #[test]
    fn outside_or_degenerate_viewport_misses() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        scene.add(root, keycap("Key_Java", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        let cam = front_camera();

        let viewport = Viewport::sized(100.0, 100.0);
        let outside = hit_test(Vec2::new(150.0, 50.0), &viewport, &cam, &scene, &[], &registry);
        assert!(outside.is_none());

        let flat = Viewport::sized(100.0, 0.0);
        assert!(hit_test(Vec2::new(50.0, 0.0), &flat, &cam, &scene, &[], &registry).is_none());
    }

    #[test]
    fn name_resolution_walks_two_ancestors() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let key = scene.add(root, Node::new("Key_React")).unwrap();
        let body = scene.add(key, Node::new("Body")).unwrap();
        let mesh = scene.add(body, keycap("Body.001", Vec3::ZERO)).unwrap();
        let deep = scene.add(mesh, keycap("Cap", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();

        assert_eq!(resolve_key(&scene, body, &registry), Some(LogicalKey::React));
        assert_eq!(resolve_key(&scene, mesh, &registry), Some(LogicalKey::React));
        assert_eq!(resolve_key(&scene, deep, &registry), None);
    }

    #[test]
    fn unregistered_node_is_a_hit_without_key() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let case = scene.add(root, keycap("Case", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        let viewport = Viewport::sized(100.0, 100.0);

        let hit = hit_test(
            viewport.center(),
            &viewport,
            &front_camera(),
            &scene,
            &[],
            &registry,
        )
        .unwrap();
        assert_eq!(hit.hit_node, case);
        assert_eq!(hit.logical_key, None);
    }

    #[test]
    fn nearest_hit_wins() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        scene.add(root, keycap("Key_C", Vec3::new(0.0, 0.0, -5.0))).unwrap();
        let near = scene.add(root, keycap("Key_Unity", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        let viewport = Viewport::sized(100.0, 100.0);

        let hit = hit_test(
            viewport.center(),
            &viewport,
            &front_camera(),
            &scene,
            &[],
            &registry,
        )
        .unwrap();
        assert_eq!(hit.hit_node, near);
        assert_eq!(hit.logical_key, Some(LogicalKey::Unity));
    }

    #[test]
    fn candidates_are_not_searched_recursively() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let group = scene.add(root, Node::new("Key_GitHub")).unwrap();
        scene.add(group, keycap("Cap", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        let viewport = Viewport::sized(100.0, 100.0);
        let cam = front_camera();

        let grouped = hit_test(viewport.center(), &viewport, &cam, &scene, &[group], &registry);
        assert!(grouped.is_none());
        let hit = hit_test(viewport.center(), &viewport, &cam, &scene, &[], &registry).unwrap();
        assert_eq!(hit.logical_key, Some(LogicalKey::Github));
    }

    #[test]
    fn triangles_refine_the_box_test() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let corner = Mesh::from_triangles(vec![[
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
        ]]);
        scene
            .add(root, Node::new("Key_CSharp").with_mesh(corner))
            .unwrap();
        let registry = KeycapRegistry::default();
        let viewport = Viewport::sized(200.0, 200.0);
        let cam = front_camera();

        let inside = screen_of(Vec3::new(-0.8, -0.8, 0.0), &cam, &viewport);
        let hit = hit_test(inside, &viewport, &cam, &scene, &[], &registry).unwrap();
        assert_eq!(hit.logical_key, Some(LogicalKey::Csharp));
        assert!((hit.distance - 10.06).abs() < 0.01);

        // Inside the bounds, outside the triangle.
        let beside = screen_of(Vec3::new(-0.1, -0.1, 0.0), &cam, &viewport);
        assert!(hit_test(beside, &viewport, &cam, &scene, &[], &registry).is_none());
    }

    #[test]
    fn scaled_parent_keeps_world_distance() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let group = scene
            .add(
                root,
                Node::new("Scaled").with_transform(Transform {
                    scale: Vec3::splat(2.0),
                    ..Transform::default()
                }),
            )
            .unwrap();
        scene.add(group, keycap("Key_HTML5", Vec3::ZERO)).unwrap();
        let registry = KeycapRegistry::default();
        let viewport = Viewport::sized(100.0, 100.0);

        let hit = hit_test(
            viewport.center(),
            &viewport,
            &front_camera(),
            &scene,
            &[],
            &registry,
        )
        .unwrap();
        // Half extent 0.5 scaled by 2 puts the front face at z = 1.
        assert!((hit.distance - 9.0).abs() < 1e-3);
    }

    #[test]
    fn candidates_only_include_registered_meshes() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let key = scene.add(root, keycap("Key-Python022", Vec3::ZERO)).unwrap();
        scene.add(root, keycap("Case", Vec3::ONE)).unwrap();
        scene.add(root, Node::new("Key_Java")).unwrap();
        let registry = KeycapRegistry::default();
        assert_eq!(keycap_candidates(&scene, root, &registry), vec![key]);
    }
}
