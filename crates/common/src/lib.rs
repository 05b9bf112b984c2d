//! Shared types used across the keyscape crates.
//!
//! # Invariants
//! - Screen coordinates are always interpreted against a [`Viewport`], never
//!   against the full display.

mod geometry;
mod types;
mod viewport;

pub use geometry::{Aabb, Ray};
pub use types::{NodeId, Rgb, Transform};
pub use viewport::Viewport;
