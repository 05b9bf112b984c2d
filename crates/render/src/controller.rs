use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

/// Where the camera looks, in both modes.
pub const FOCUS_POINT: Vec3 = Vec3::new(-4.0, 2.0, -2.0);

const ARRIVED: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// Slow automatic circle around the keyboard.
    #[default]
    Overview,
    /// Fixed close-up used for selecting keys.
    Focused,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Overview => Self::Focused,
            Self::Focused => Self::Overview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub overview_radius: f32,
    pub overview_height: f32,
    /// Overview angular velocity in rad/s.
    pub angular_velocity: f32,
    pub focused_position: Vec3,
    pub look_at: Vec3,
    /// Natural frequency of the critically damped follow spring, 1/s.
    pub stiffness: f32,
    /// Speed injected toward the new target on a mode change, u/s.
    pub kick_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Radians of overview phase per pixel of horizontal drag.
    pub orbit_sensitivity: f32,
    /// World units of height per pixel of vertical two-finger pan.
    pub pan_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            overview_radius: 35.0,
            overview_height: 30.0,
            angular_velocity: 0.3,
            focused_position: Vec3::new(0.0, 20.0, 18.0),
            look_at: FOCUS_POINT,
            stiffness: 3.0,
            kick_speed: 15.0,
            min_radius: 15.0,
            max_radius: 60.0,
            min_height: 5.0,
            max_height: 60.0,
            orbit_sensitivity: 0.005,
            pan_sensitivity: 0.05,
        }
    }
}

/// Everything the controller integrates from frame to frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub mode: CameraMode,
    pub position: Vec3,
    pub target: Vec3,
    pub angular_phase: f32,
    pub velocity: Vec3,
}

/// Drives a [`Camera`] between the overview circle and the focused
/// close-up.
///
/// Each frame the camera position follows its target through the exact
/// solution of a critically damped spring, so the motion is independent of
/// frame rate and never oscillates. A requested mode change is applied at
/// the start of the next frame together with a velocity kick toward the new
/// target. The kick is clamped to `stiffness * distance`, which keeps the
/// approach monotone.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
    requested: Option<CameraMode>,
    radius: f32,
    height: f32,
    placed: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let radius = config.overview_radius;
        let height = config.overview_height;
        let start = Vec3::new(radius, height, 0.0);
        Self {
            config,
            state: CameraState {
                mode: CameraMode::Overview,
                position: start,
                target: start,
                angular_phase: 0.0,
                velocity: Vec3::ZERO,
            },
            requested: None,
            radius,
            height,
            placed: false,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Mode after any pending request is applied.
    pub fn mode(&self) -> CameraMode {
        self.requested.unwrap_or(self.state.mode)
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Request a mode; takes effect on the next [`update`](Self::update).
    pub fn set_mode(&mut self, mode: CameraMode) {
        self.requested = Some(mode);
    }

    pub fn toggle(&mut self) -> CameraMode {
        let next = self.mode().toggled();
        self.set_mode(next);
        next
    }

    /// Drag input: horizontal pixels turn the overview circle.
    pub fn orbit(&mut self, delta_px: Vec2) {
        self.state.angular_phase += delta_px.x * self.config.orbit_sensitivity;
    }

    /// Pinch input: a factor above 1 moves the overview closer.
    pub fn zoom(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        self.radius = (self.radius / factor).clamp(self.config.min_radius, self.config.max_radius);
    }

    /// Two-finger pan: vertical pixels raise or lower the overview circle.
    pub fn pan(&mut self, delta_px: Vec2) {
        self.height = (self.height + delta_px.y * self.config.pan_sensitivity)
            .clamp(self.config.min_height, self.config.max_height);
    }

    /// Largest overshoot past the target that a kick of the configured speed
    /// could produce from rest at the target: `kick / (stiffness * e)`.
    pub fn overshoot_bound(&self) -> f32 {
        self.config.kick_speed / (self.config.stiffness * std::f32::consts::E)
    }

    /// Where the camera is heading for a mode at the current phase.
    pub fn target_for(&self, mode: CameraMode) -> Vec3 {
        match mode {
            CameraMode::Overview => {
                let phase = self.state.angular_phase;
                Vec3::new(
                    self.radius * phase.cos(),
                    self.height,
                    self.radius * phase.sin(),
                )
            }
            CameraMode::Focused => self.config.focused_position,
        }
    }

    /// Advance one frame of `dt` seconds and place `camera`.
    pub fn update(&mut self, dt: f32, camera: &mut Camera) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let mut changed = false;
        if let Some(mode) = self.requested.take() {
            if mode != self.state.mode {
                tracing::debug!(from = ?self.state.mode, to = ?mode, "camera mode change");
                self.state.mode = mode;
                changed = true;
            }
        }

        if self.state.mode == CameraMode::Overview {
            self.state.angular_phase += self.config.angular_velocity * dt;
        }
        let target = self.target_for(self.state.mode);
        self.state.target = target;

        if !self.placed {
            self.state.position = target;
            self.state.velocity = Vec3::ZERO;
            self.placed = true;
        } else {
            if changed {
                self.kick(target);
            }
            self.spring_step(target, dt);
        }

        camera.position = self.state.position;
        camera.look_at(self.config.look_at);
    }

    fn kick(&mut self, target: Vec3) {
        let offset = target - self.state.position;
        let distance = offset.length();
        if distance < ARRIVED {
            self.state.velocity = Vec3::ZERO;
            return;
        }
        let speed = self.config.kick_speed.min(self.config.stiffness * distance);
        self.state.velocity = offset / distance * speed;
    }

    /// Exact critically damped step toward a target held fixed for `dt`:
    /// `x(t) = target + (c1 + c2 t) e^(-w t)`.
    fn spring_step(&mut self, target: Vec3, dt: f32) {
        let omega = self.config.stiffness;
        let c1 = self.state.position - target;
        let c2 = self.state.velocity + c1 * omega;
        let decay = (-omega * dt).exp();
        let offset = c1 + c2 * dt;
        self.state.position = target + offset * decay;
        self.state.velocity = (c2 - offset * omega) * decay;
    }
}
