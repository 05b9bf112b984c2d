//! Asset loading: resolves bundled models to local files and imports glTF
//! 2.0 (`.gltf` / `.glb`) into a [`keyscape_scene::SceneGraph`].
//!
//! # Invariants
//! - A failed load is reported once and never retried.
//! - "No scene yet" is a waiting state, not an error.

mod gltf;
mod loader;
mod resolve;

pub use gltf::parse_gltf;
pub use loader::{LoadStatus, ModelLoader, fetch_model, load_model};
pub use resolve::{AssetResolver, ModelSource};

/// Errors from resolving and parsing models.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("invalid asset id: {0:?}")]
    InvalidId(String),
    #[error("glTF parse error: {0}")]
    GltfParse(String),
    #[error("GLB container error: {0}")]
    Glb(String),
    #[error("loader thread ended without a result")]
    LoaderGone,
}
