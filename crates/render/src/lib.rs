//! View side of the keyboard scene: camera, camera controller, ray picking
//! and highlight feedback, plus a renderer-agnostic interface.
//!
//! # Invariants
//! - The controller is the only writer of camera state.
//! - Hit-testing is a pure query over the scene.
//! - Every highlight is reverted to the colour the node had before it was
//!   first highlighted.
//!
//! # Workaround
//! Ships a debug text renderer only. The [`Renderer`] trait is stable; a GPU
//! implementation can replace it without changing consumers.

mod camera;
mod controller;
mod highlight;
mod pick;
mod renderer;

pub use camera::Camera;
pub use controller::{CameraConfig, CameraController, CameraMode, CameraState, FOCUS_POINT};
pub use highlight::{FeedbackConfig, HIGHLIGHT_COLOR, SelectionFeedback};
pub use pick::{HitResult, hit_test, intersect_node, keycap_candidates, resolve_key};
pub use renderer::{DebugTextRenderer, Renderer};
