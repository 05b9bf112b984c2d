//! glTF 2.0 import.
//!
//! Only what picking and highlighting need is imported: the node hierarchy
//! with transforms, mesh bounds and triangles, and material colours.
//! Animations, skins, cameras, textures and sparse accessors are ignored.

use glam::{Mat4, Quat, Vec3};
use keyscape_common::{Aabb, Rgb, Transform};
use keyscape_scene::{Material, Mesh, Node, SceneGraph};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::AssetError;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_U8: u32 = 5121;
const COMPONENT_U16: u32 = 5123;
const COMPONENT_U32: u32 = 5125;
const COMPONENT_F32: u32 = 5126;
const MODE_TRIANGLES: u32 = 4;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<SceneDef>,
    #[serde(default)]
    nodes: Vec<NodeDef>,
    #[serde(default)]
    meshes: Vec<MeshDef>,
    #[serde(default)]
    accessors: Vec<AccessorDef>,
    #[serde(default)]
    buffer_views: Vec<BufferViewDef>,
    #[serde(default)]
    buffers: Vec<BufferDef>,
    #[serde(default)]
    materials: Vec<MaterialDef>,
}

#[derive(Debug, Default, Deserialize)]
struct SceneDef {
    name: Option<String>,
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeDef {
    name: Option<String>,
    #[serde(default)]
    children: Vec<usize>,
    mesh: Option<usize>,
    matrix: Option<[f32; 16]>,
    translation: Option<[f32; 3]>,
    rotation: Option<[f32; 4]>,
    scale: Option<[f32; 3]>,
}

#[derive(Debug, Default, Deserialize)]
struct MeshDef {
    name: Option<String>,
    #[serde(default)]
    primitives: Vec<PrimitiveDef>,
}

#[derive(Debug, Default, Deserialize)]
struct PrimitiveDef {
    #[serde(default)]
    attributes: BTreeMap<String, usize>,
    indices: Option<usize>,
    material: Option<usize>,
    mode: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessorDef {
    buffer_view: Option<usize>,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    kind: String,
    min: Option<Vec<f32>>,
    max: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferViewDef {
    buffer: usize,
    #[serde(default)]
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferDef {
    uri: Option<String>,
    #[allow(dead_code)]
    byte_length: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterialDef {
    name: Option<String>,
    pbr_metallic_roughness: Option<PbrDef>,
    emissive_factor: Option<[f32; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PbrDef {
    base_color_factor: Option<[f32; 4]>,
}

/// Split a binary glTF container into its JSON and optional BIN chunks.
pub(crate) fn split_glb(bytes: &[u8]) -> Result<(&[u8], Option<&[u8]>), AssetError> {
    if bytes.len() < 12 || &bytes[0..4] != GLB_MAGIC {
        return Err(AssetError::Glb("missing glTF header".into()));
    }
    let version = read_u32(bytes, 4).ok_or_else(|| AssetError::Glb("truncated header".into()))?;
    if version != GLB_VERSION {
        return Err(AssetError::Glb(format!("unsupported container version {version}")));
    }
    let declared =
        read_u32(bytes, 8).ok_or_else(|| AssetError::Glb("truncated header".into()))? as usize;
    let total = declared.min(bytes.len());

    let mut json = None;
    let mut bin = None;
    let mut offset = 12;
    while offset + 8 <= total {
        let len = read_u32(bytes, offset).unwrap_or(0) as usize;
        let kind = read_u32(bytes, offset + 4).unwrap_or(0);
        let start = offset + 8;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= total)
            .ok_or_else(|| AssetError::Glb(format!("chunk at {offset} overruns the file")))?;
        match kind {
            CHUNK_JSON if json.is_none() => json = Some(&bytes[start..end]),
            CHUNK_BIN if bin.is_none() => bin = Some(&bytes[start..end]),
            _ => tracing::trace!(kind, "skipping glb chunk"),
        }
        offset = end;
    }
    let json = json.ok_or_else(|| AssetError::Glb("no JSON chunk".into()))?;
    Ok((json, bin))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

fn read_f32(bytes: &[u8], offset: usize) -> Option<f32> {
    read_u32(bytes, offset).map(f32::from_bits)
}

/// Parse a `.gltf` or `.glb` payload. `base_dir` locates external buffers.
pub fn parse_gltf(bytes: &[u8], base_dir: Option<&Path>) -> Result<SceneGraph, AssetError> {
    let (json, bin) = if bytes.starts_with(GLB_MAGIC) {
        split_glb(bytes)?
    } else {
        (bytes, None)
    };
    let doc: Document =
        serde_json::from_slice(json).map_err(|e| AssetError::GltfParse(e.to_string()))?;
    Importer::new(&doc, bin, base_dir).import()
}

struct Importer<'a> {
    doc: &'a Document,
    buffers: Vec<Option<Vec<u8>>>,
}

impl<'a> Importer<'a> {
    fn new(doc: &'a Document, bin: Option<&[u8]>, base_dir: Option<&Path>) -> Self {
        let buffers = doc
            .buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| load_buffer(i, buffer, bin, base_dir))
            .collect();
        Self { doc, buffers }
    }

    fn import(&self) -> Result<SceneGraph, AssetError> {
        let scene_def = self
            .doc
            .scene
            .or(if self.doc.scenes.is_empty() { None } else { Some(0) })
            .map(|i| {
                self.doc
                    .scenes
                    .get(i)
                    .ok_or_else(|| AssetError::GltfParse(format!("scene {i} does not exist")))
            })
            .transpose()?;

        let roots: Vec<usize> = match scene_def {
            Some(scene) => scene.nodes.clone(),
            None => self.parentless_nodes(),
        };
        let root_name = scene_def
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| "Scene".to_string());

        let mut graph = SceneGraph::with_root(Node::new(root_name));
        let mut visited = HashSet::new();
        let root = graph.root();
        for index in roots {
            self.import_node(&mut graph, root, index, &mut visited)?;
        }
        tracing::debug!(nodes = graph.len(), "glTF imported");
        Ok(graph)
    }

    fn parentless_nodes(&self) -> Vec<usize> {
        let children: HashSet<usize> = self
            .doc
            .nodes
            .iter()
            .flat_map(|n| n.children.iter().copied())
            .collect();
        (0..self.doc.nodes.len())
            .filter(|i| !children.contains(i))
            .collect()
    }

    fn import_node(
        &self,
        graph: &mut SceneGraph,
        parent: keyscape_common::NodeId,
        index: usize,
        visited: &mut HashSet<usize>,
    ) -> Result<(), AssetError> {
        if !visited.insert(index) {
            return Err(AssetError::GltfParse(format!("node {index} is referenced twice")));
        }
        let def = self
            .doc
            .nodes
            .get(index)
            .ok_or_else(|| AssetError::GltfParse(format!("node {index} does not exist")))?;

        let mesh_def = match def.mesh {
            Some(m) => Some(
                self.doc
                    .meshes
                    .get(m)
                    .ok_or_else(|| AssetError::GltfParse(format!("mesh {m} does not exist")))?,
            ),
            None => None,
        };
        let name = def
            .name
            .clone()
            .or_else(|| mesh_def.and_then(|m| m.name.clone()))
            .unwrap_or_else(|| format!("node_{index}"));

        let mut node = Node::new(name.clone()).with_transform(node_transform(def));
        let mut split_primitives = Vec::new();
        if let Some(mesh_def) = mesh_def {
            match mesh_def.primitives.as_slice() {
                [single] => {
                    let (mesh, material) = self.primitive(single)?;
                    node = node.with_mesh(mesh).with_material(material);
                }
                many => split_primitives.extend(many.iter()),
            }
        }
        let id = graph
            .add(parent, node)
            .map_err(|e| AssetError::GltfParse(e.to_string()))?;

        if !split_primitives.is_empty() {
            let base = mesh_def
                .and_then(|m| m.name.clone())
                .unwrap_or_else(|| name.clone());
            for (n, prim) in split_primitives.into_iter().enumerate() {
                let (mesh, material) = self.primitive(prim)?;
                let child = Node::new(format!("{base}_{}", n + 1))
                    .with_mesh(mesh)
                    .with_material(material);
                graph
                    .add(id, child)
                    .map_err(|e| AssetError::GltfParse(e.to_string()))?;
            }
        }

        for child in &def.children {
            self.import_node(graph, id, *child, visited)?;
        }
        Ok(())
    }

    fn primitive(&self, prim: &PrimitiveDef) -> Result<(Mesh, Material), AssetError> {
        let material = match prim.material {
            Some(m) => self.material(m)?,
            None => Material::default(),
        };

        let Some(&position) = prim.attributes.get("POSITION") else {
            tracing::warn!("primitive without POSITION attribute is not pickable");
            return Ok((Mesh::default(), material));
        };
        let accessor = self
            .doc
            .accessors
            .get(position)
            .ok_or_else(|| AssetError::GltfParse(format!("accessor {position} does not exist")))?;

        let positions = self.read_vec3(accessor);
        let declared_bounds = match (&accessor.min, &accessor.max) {
            (Some(min), Some(max)) if min.len() == 3 && max.len() == 3 => Some(Aabb::new(
                Vec3::new(min[0], min[1], min[2]),
                Vec3::new(max[0], max[1], max[2]),
            )),
            _ => None,
        };

        let triangles = match (&positions, prim.mode.unwrap_or(MODE_TRIANGLES)) {
            (Some(positions), MODE_TRIANGLES) => self.triangles(prim, positions)?,
            _ => Vec::new(),
        };
        let bounds = declared_bounds
            .or_else(|| positions.as_ref().and_then(|p| Aabb::from_points(p.iter().copied())));
        if bounds.is_none() {
            tracing::warn!(
                accessor = position,
                "primitive has no bounds and no readable positions"
            );
        }
        Ok((Mesh { bounds, triangles }, material))
    }

    fn triangles(
        &self,
        prim: &PrimitiveDef,
        positions: &[Vec3],
    ) -> Result<Vec<[Vec3; 3]>, AssetError> {
        let indices: Vec<u32> = match prim.indices {
            Some(i) => {
                let accessor = self
                    .doc
                    .accessors
                    .get(i)
                    .ok_or_else(|| AssetError::GltfParse(format!("accessor {i} does not exist")))?;
                match self.read_indices(accessor) {
                    Some(indices) => indices,
                    None => return Ok(Vec::new()),
                }
            }
            None => (0..positions.len() as u32).collect(),
        };
        let mut out = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            let vertex = |i: u32| positions.get(i as usize).copied();
            match (vertex(tri[0]), vertex(tri[1]), vertex(tri[2])) {
                (Some(a), Some(b), Some(c)) => out.push([a, b, c]),
                _ => {
                    return Err(AssetError::GltfParse(format!(
                        "index out of range in triangle {tri:?}"
                    )));
                }
            }
        }
        Ok(out)
    }

    fn material(&self, index: usize) -> Result<Material, AssetError> {
        let def = self
            .doc
            .materials
            .get(index)
            .ok_or_else(|| AssetError::GltfParse(format!("material {index} does not exist")))?;
        Ok(Material {
            name: def.name.clone().unwrap_or_else(|| format!("material_{index}")),
            base_color: def
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|p| p.base_color_factor)
                .unwrap_or([1.0, 1.0, 1.0, 1.0]),
            emissive: Some(Rgb::from_factors(def.emissive_factor.unwrap_or([0.0; 3]))),
        })
    }

    /// Byte slice and stride backing an accessor, if its buffer is loaded.
    fn view(&self, accessor: &AccessorDef, element_size: usize) -> Option<(&[u8], usize, usize)> {
        let view = self.doc.buffer_views.get(accessor.buffer_view?)?;
        let buffer = self.buffers.get(view.buffer)?.as_deref()?;
        let end = view.byte_offset.checked_add(view.byte_length)?;
        let data = buffer.get(view.byte_offset..end)?;
        let stride = view.byte_stride.unwrap_or(element_size);
        Some((data, accessor.byte_offset, stride))
    }

    fn read_vec3(&self, accessor: &AccessorDef) -> Option<Vec<Vec3>> {
        if accessor.component_type != COMPONENT_F32 || accessor.kind != "VEC3" {
            return None;
        }
        let (data, start, stride) = self.view(accessor, 12)?;
        (0..accessor.count)
            .map(|i| {
                let at = start + i * stride;
                Some(Vec3::new(
                    read_f32(data, at)?,
                    read_f32(data, at + 4)?,
                    read_f32(data, at + 8)?,
                ))
            })
            .collect()
    }

    fn read_indices(&self, accessor: &AccessorDef) -> Option<Vec<u32>> {
        if accessor.kind != "SCALAR" {
            return None;
        }
        let size = match accessor.component_type {
            COMPONENT_U8 => 1,
            COMPONENT_U16 => 2,
            COMPONENT_U32 => 4,
            _ => return None,
        };
        let (data, start, stride) = self.view(accessor, size)?;
        (0..accessor.count)
            .map(|i| {
                let at = start + i * stride;
                let raw = data.get(at..at + size)?;
                Some(match size {
                    1 => raw[0] as u32,
                    2 => u16::from_le_bytes([raw[0], raw[1]]) as u32,
                    _ => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                })
            })
            .collect()
    }
}

fn load_buffer(
    index: usize,
    buffer: &BufferDef,
    bin: Option<&[u8]>,
    base_dir: Option<&Path>,
) -> Option<Vec<u8>> {
    match buffer.uri.as_deref() {
        None if index == 0 => bin.map(<[u8]>::to_vec),
        None => None,
        Some(uri) if uri.starts_with("data:") => {
            tracing::warn!(
                buffer = index,
                "embedded data URIs are not decoded; meshes keep bounds only"
            );
            None
        }
        Some(uri) => {
            let path = base_dir.map(|d| d.join(uri))?;
            match std::fs::read(&path) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::warn!(
                        buffer = index,
                        path = %path.display(),
                        "cannot read buffer: {e}"
                    );
                    None
                }
            }
        }
    }
}

fn node_transform(def: &NodeDef) -> Transform {
    if let Some(m) = def.matrix {
        return Transform::from_matrix(Mat4::from_cols_array(&m));
    }
    Transform {
        position: def.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
        rotation: def
            .rotation
            .map(|r| Quat::from_array(r).normalize())
            .unwrap_or(Quat::IDENTITY),
        scale: def.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
    }
}
