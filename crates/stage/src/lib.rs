//! Scene bootstrap: one owned [`Stage`] holds the scene, camera, gesture
//! arbiter and highlight state, and turns pointer input into key presses.
//!
//! # Invariants
//! - All camera and gesture mutation happens inside `handle_pointer` and
//!   `frame`, on the caller's thread.
//! - No hit-testing before both a model and a viewport are present.
//! - A key-press callback fires once per confirmed, mapped tap.

mod config;
pub mod demo;
mod stage;

pub use config::{ConfigError, StageConfig};
pub use stage::{KeyPressHandler, Stage};

use keyscape_scene::SceneError;

/// Errors from stage operations.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
