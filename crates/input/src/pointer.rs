use glam::Vec2;
use std::time::Duration;

/// Identifies one finger or mouse button stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw pointer sample. `position` is in viewport space; `timestamp` is
/// monotonic time since an arbitrary origin shared by all events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer: PointerId,
    pub phase: PointerPhase,
    pub position: Vec2,
    pub timestamp: Duration,
}

impl PointerEvent {
    pub fn new(pointer: u64, phase: PointerPhase, position: Vec2, timestamp: Duration) -> Self {
        Self {
            pointer: PointerId(pointer),
            phase,
            position,
            timestamp,
        }
    }

    pub fn down(pointer: u64, position: Vec2, timestamp: Duration) -> Self {
        Self::new(pointer, PointerPhase::Down, position, timestamp)
    }

    pub fn moved(pointer: u64, position: Vec2, timestamp: Duration) -> Self {
        Self::new(pointer, PointerPhase::Move, position, timestamp)
    }

    pub fn up(pointer: u64, position: Vec2, timestamp: Duration) -> Self {
        Self::new(pointer, PointerPhase::Up, position, timestamp)
    }

    pub fn cancel(pointer: u64, position: Vec2, timestamp: Duration) -> Self {
        Self::new(pointer, PointerPhase::Cancel, position, timestamp)
    }
}
