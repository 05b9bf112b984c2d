use glam::Vec2;

/// A high-level action produced from pointer input (or by the host UI).
///
/// The stage consumes actions, never raw pointer events, so mouse and touch
/// input drive the same scene logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Confirmed tap at a viewport-space position.
    Select(Vec2),
    /// Single-pointer drag, pixel delta since the previous sample.
    Orbit(Vec2),
    /// Pinch scale since the previous sample; above 1 when fingers spread.
    Zoom(f32),
    /// Two-finger midpoint delta in pixels.
    Pan(Vec2),
    /// Switch between the overview and focused camera.
    ToggleFocus,
}
