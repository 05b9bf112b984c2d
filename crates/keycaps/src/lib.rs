//! Keycap Registry: static mapping from scene node names to logical keys.
//!
//! # Invariants
//! - A node name resolves to at most one key.
//! - The registry is immutable once built; extending it yields a new registry.

mod key;
mod registry;

pub use key::{LogicalKey, TECH_STACKS, UnknownKey};
pub use registry::{KeyBinding, KeycapRegistry, RegistryError};
