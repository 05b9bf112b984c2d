use glam::Mat4;
use keyscape_common::{NodeId, Rgb};
use std::collections::BTreeMap;

use crate::node::Node;

/// Errors from structural scene operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("the root node cannot be removed")]
    RootRemoval,
}

/// An owned scene graph.
///
/// Nodes live in a BTreeMap keyed by id, so iteration follows insertion
/// order. The graph owns its nodes outright; callers hold `NodeId`s, which
/// stop resolving once the node is removed.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
    next_id: u32,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph holding only a root node named `"root"`.
    pub fn new() -> Self {
        Self::with_root(Node::new("root"))
    }

    pub fn with_root(mut root: Node) -> Self {
        root.parent = None;
        root.children.clear();
        let id = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(id, root);
        Self {
            nodes,
            root: id,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A graph always contains its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Insert `node` as the last child of `parent`.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.insert(id, node);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Remove a node and its whole subtree. Returns the removed ids in
    /// pre-order.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        if !self.nodes.contains_key(&id) {
            return Err(SceneError::NodeNotFound(id));
        }
        let removed = self.descendants(id);
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != id);
            }
        }
        for r in &removed {
            self.nodes.remove(r);
        }
        tracing::trace!(node = %id, count = removed.len(), "removed subtree");
        Ok(removed)
    }

    /// `id` followed by all of its descendants, depth-first pre-order.
    /// Empty when `id` does not exist.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every node from the root, depth-first pre-order.
    pub fn traverse(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// The node's parent, grandparent, … up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// First node named `name` in traversal order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.traverse()
            .into_iter()
            .find(|id| self.name(*id) == Some(name))
    }

    /// Nodes under `from` (inclusive) that carry a mesh.
    pub fn mesh_nodes(&self, from: NodeId) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(Node::is_mesh))
            .collect()
    }

    /// Local-to-world matrix: the product of every transform from the root
    /// down to `id`.
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(&id)?;
        let mut matrix = node.transform.matrix();
        for ancestor in self.ancestors(id) {
            if let Some(a) = self.nodes.get(&ancestor) {
                matrix = a.transform.matrix() * matrix;
            }
        }
        Some(matrix)
    }

    pub fn emissive(&self, id: NodeId) -> Option<Rgb> {
        self.nodes.get(&id).and_then(Node::emissive)
    }

    /// Set the highlightable colour. Returns `false` without touching
    /// anything when the node is gone or has no emissive property.
    pub fn set_emissive(&mut self, id: NodeId, color: Rgb) -> bool {
        let Some(slot) = self
            .nodes
            .get_mut(&id)
            .and_then(|n| n.material.as_mut())
            .and_then(|m| m.emissive.as_mut())
        else {
            return false;
        };
        *slot = color;
        true
    }

    /// Copy every node of `other` under `parent`. The other graph's root
    /// becomes a child of `parent`; returns its new id.
    pub fn graft(&mut self, parent: NodeId, other: &SceneGraph) -> Result<NodeId, SceneError> {
        let mut remap: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for old in other.traverse() {
            let Some(node) = other.get(old) else {
                continue;
            };
            let new_parent = match node.parent {
                Some(p) => *remap.get(&p).ok_or(SceneError::NodeNotFound(p))?,
                None => parent,
            };
            let new_id = self.add(new_parent, node.clone())?;
            remap.insert(old, new_id);
        }
        remap
            .get(&other.root)
            .copied()
            .ok_or(SceneError::NodeNotFound(other.root))
    }
}
