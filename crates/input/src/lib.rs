//! Pointer input mapped to high-level actions.
//!
//! # Invariants
//! - Consumers see [`Action`]s, never raw pointer events.
//! - A gesture is either a tap or a manipulation, never both.
//! - Confirmed taps closer together than the debounce window collapse to one.

pub mod action;
pub mod gesture;
pub mod pointer;

pub use action::Action;
pub use gesture::{GestureArbiter, GestureConfig, GesturePhase, GestureState, TapRecognizer};
pub use pointer::{PointerEvent, PointerId, PointerPhase};
