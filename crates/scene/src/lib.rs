//! Scene graph: an arena of named nodes rooted at a single root node.
//!
//! # Invariants
//! - Every node except the root has exactly one parent that exists.
//! - Node ids are never reused, so stale ids stop resolving after removal.
//! - All structural mutations flow through explicit operations.

pub mod graph;
pub mod node;

pub use graph::{SceneError, SceneGraph};
pub use node::{Light, Material, Mesh, Node};
