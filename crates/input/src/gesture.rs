use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::action::Action;
use crate::pointer::{PointerEvent, PointerId, PointerPhase};

/// Thresholds that separate a tap from a manipulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Cumulative pointer travel (pixels) at which a press becomes a drag.
    pub drag_threshold_px: f32,
    /// Presses held at least this long are not taps.
    pub max_tap_ms: u64,
    /// Minimum spacing between two dispatched taps.
    pub debounce_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 10.0,
            max_tap_ms: 350,
            debounce_ms: 300,
        }
    }
}

impl GestureConfig {
    pub fn max_tap_duration(&self) -> Duration {
        Duration::from_millis(self.max_tap_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Pressing,
    Dragging,
}

/// Bookkeeping for the gesture in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureState {
    pub phase: GesturePhase,
    pub last_event_timestamp: Option<Duration>,
    pub last_pointer_position: Option<Vec2>,
    /// The pointer this gesture follows.
    pub pointer: Option<PointerId>,
    pub press_origin: Option<Vec2>,
    pub press_started: Option<Duration>,
    /// Sum of segment lengths since the press, not displacement.
    pub travel: f32,
}

/// Single-pointer tap recognition with debounce.
///
/// A press stays a tap candidate while its cumulative travel is below the
/// drag threshold. Releasing it quickly enough yields a tap at the release
/// position; [`TapRecognizer::accept`] then applies the debounce window.
#[derive(Debug, Clone)]
pub struct TapRecognizer {
    config: GestureConfig,
    state: GestureState,
    last_dispatched: Option<Duration>,
}

impl TapRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::default(),
            last_dispatched: None,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn press(&mut self, event: &PointerEvent) {
        self.state = GestureState {
            phase: GesturePhase::Pressing,
            last_event_timestamp: Some(event.timestamp),
            last_pointer_position: Some(event.position),
            pointer: Some(event.pointer),
            press_origin: Some(event.position),
            press_started: Some(event.timestamp),
            travel: 0.0,
        };
    }

    /// Track motion of the followed pointer. Returns the segment delta once
    /// the gesture is a drag.
    pub fn motion(&mut self, event: &PointerEvent) -> Option<Vec2> {
        if self.state.pointer != Some(event.pointer) {
            return None;
        }
        let delta = self.advance(event);
        (self.state.phase == GesturePhase::Dragging).then_some(delta)
    }

    /// Release of the followed pointer. Returns the tap position when the
    /// press qualifies as a tap; debounce is not applied here.
    pub fn release(&mut self, event: &PointerEvent) -> Option<Vec2> {
        if self.state.pointer != Some(event.pointer) {
            return None;
        }
        self.advance(event);
        let elapsed = self
            .state
            .press_started
            .map(|start| event.timestamp.saturating_sub(start))
            .unwrap_or_default();

        let tap = match self.state.phase {
            GesturePhase::Pressing if elapsed < self.config.max_tap_duration() => {
                Some(event.position)
            }
            GesturePhase::Pressing => {
                tracing::debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "press too long for a tap"
                );
                None
            }
            _ => None,
        };
        self.reset();
        tap
    }

    /// Debounce a recognised tap. Returns whether it may be dispatched, and
    /// if so records it as the latest dispatched tap.
    pub fn accept(&mut self, at: Duration) -> bool {
        if let Some(last) = self.last_dispatched {
            let since = at.saturating_sub(last);
            if since < self.config.debounce() {
                tracing::debug!(since_ms = since.as_millis() as u64, "tap suppressed by debounce");
                return false;
            }
        }
        self.last_dispatched = Some(at);
        true
    }

    /// The gesture can no longer be a tap (e.g. a second finger landed).
    pub fn cancel_tap(&mut self) {
        if self.state.phase == GesturePhase::Pressing {
            tracing::debug!("tap cancelled by multi-touch");
            self.state.phase = GesturePhase::Dragging;
        }
    }

    /// Continue the current manipulation with a different pointer.
    pub fn adopt(&mut self, pointer: PointerId, position: Vec2) {
        self.state.pointer = Some(pointer);
        self.state.last_pointer_position = Some(position);
        self.state.phase = GesturePhase::Dragging;
    }

    /// Back to idle. Debounce history is kept.
    pub fn reset(&mut self) {
        self.state = GestureState {
            last_event_timestamp: self.state.last_event_timestamp,
            last_pointer_position: self.state.last_pointer_position,
            ..GestureState::default()
        };
    }

    fn advance(&mut self, event: &PointerEvent) -> Vec2 {
        let previous = self.state.last_pointer_position.unwrap_or(event.position);
        let delta = event.position - previous;
        self.state.travel += delta.length();
        self.state.last_pointer_position = Some(event.position);
        self.state.last_event_timestamp = Some(event.timestamp);
        if self.state.phase == GesturePhase::Pressing
            && self.state.travel >= self.config.drag_threshold_px
        {
            tracing::debug!(travel = self.state.travel, "press became a drag");
            self.state.phase = GesturePhase::Dragging;
        }
        delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pinch {
    distance: f32,
    midpoint: Vec2,
}

/// Turns raw pointer events into [`Action`]s.
///
/// Two recognisers share the event stream: the tap recogniser claims short,
/// still presses, and continuous manipulation takes everything else (one
/// pointer orbits, two pointers zoom and pan). The stage flips the gates when
/// the camera mode changes.
#[derive(Debug, Clone)]
pub struct GestureArbiter {
    tap: TapRecognizer,
    pointers: BTreeMap<PointerId, Vec2>,
    pinch: Option<Pinch>,
    select_enabled: bool,
    orbit_enabled: bool,
}

impl Default for GestureArbiter {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureArbiter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            tap: TapRecognizer::new(config),
            pointers: BTreeMap::new(),
            pinch: None,
            select_enabled: true,
            orbit_enabled: true,
        }
    }

    pub fn state(&self) -> &GestureState {
        self.tap.state()
    }

    pub fn select_enabled(&self) -> bool {
        self.select_enabled
    }

    pub fn orbit_enabled(&self) -> bool {
        self.orbit_enabled
    }

    pub fn set_select_enabled(&mut self, enabled: bool) {
        self.select_enabled = enabled;
    }

    pub fn set_orbit_enabled(&mut self, enabled: bool) {
        self.orbit_enabled = enabled;
    }

    /// Number of pointers currently down.
    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn handle(&mut self, event: PointerEvent) -> Vec<Action> {
        match event.phase {
            PointerPhase::Down => self.pointer_down(&event),
            PointerPhase::Move => self.pointer_moved(&event),
            PointerPhase::Up => self.pointer_up(&event),
            PointerPhase::Cancel => {
                if self.pointers.remove(&event.pointer).is_some() {
                    if self.tap.state().pointer == Some(event.pointer) {
                        self.tap.reset();
                    }
                    self.settle();
                }
                Vec::new()
            }
        }
    }

    fn pointer_down(&mut self, event: &PointerEvent) -> Vec<Action> {
        self.pointers.insert(event.pointer, event.position);
        if self.pointers.len() == 1 {
            self.tap.press(event);
        } else {
            self.tap.cancel_tap();
            self.pinch = self.pinch_sample();
        }
        Vec::new()
    }

    fn pointer_moved(&mut self, event: &PointerEvent) -> Vec<Action> {
        // Hover or a pointer we never saw go down.
        let Some(slot) = self.pointers.get_mut(&event.pointer) else {
            return Vec::new();
        };
        *slot = event.position;

        if self.pointers.len() >= 2 {
            return self.pinch_actions();
        }
        match self.tap.motion(event) {
            Some(delta) if self.orbit_enabled && delta != Vec2::ZERO => vec![Action::Orbit(delta)],
            _ => Vec::new(),
        }
    }

    fn pointer_up(&mut self, event: &PointerEvent) -> Vec<Action> {
        if self.pointers.remove(&event.pointer).is_none() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if let Some(position) = self.tap.release(event) {
            if !self.select_enabled {
                tracing::debug!("tap ignored, selection disabled");
            } else if self.tap.accept(event.timestamp) {
                tracing::debug!(x = position.x, y = position.y, "tap confirmed");
                actions.push(Action::Select(position));
            }
        }
        self.settle();
        actions
    }

    fn settle(&mut self) {
        match self.pointers.len() {
            0 => {
                self.tap.reset();
                self.pinch = None;
            }
            1 => {
                self.pinch = None;
                if let Some((&pointer, &position)) = self.pointers.iter().next() {
                    self.tap.adopt(pointer, position);
                }
            }
            _ => self.pinch = self.pinch_sample(),
        }
    }

    fn pinch_sample(&self) -> Option<Pinch> {
        let mut points = self.pointers.values();
        let a = *points.next()?;
        let b = *points.next()?;
        Some(Pinch {
            distance: a.distance(b),
            midpoint: (a + b) * 0.5,
        })
    }

    fn pinch_actions(&mut self) -> Vec<Action> {
        let Some(next) = self.pinch_sample() else {
            return Vec::new();
        };
        let Some(previous) = self.pinch.replace(next) else {
            return Vec::new();
        };
        if !self.orbit_enabled {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if previous.distance > f32::EPSILON && next.distance > f32::EPSILON {
            let factor = next.distance / previous.distance;
            if (factor - 1.0).abs() > 1e-6 {
                actions.push(Action::Zoom(factor));
            }
        }
        let pan = next.midpoint - previous.midpoint;
        if pan != Vec2::ZERO {
            actions.push(Action::Pan(pan));
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tap(arbiter: &mut GestureArbiter, at: Vec2, start_ms: u64, end_ms: u64) -> Vec<Action> {
        let mut out = arbiter.handle(PointerEvent::down(1, at, ms(start_ms)));
        out.extend(arbiter.handle(PointerEvent::up(1, at, ms(end_ms))));
        out
    }

    fn selects(actions: &[Action]) -> Vec<Vec2> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Select(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn short_still_press_is_one_tap_at_release() {
        let mut arbiter = GestureArbiter::default();
        let mut out = arbiter.handle(PointerEvent::down(1, Vec2::new(100.0, 100.0), ms(0)));
        out.extend(arbiter.handle(PointerEvent::moved(1, Vec2::new(103.0, 104.0), ms(50))));
        out.extend(arbiter.handle(PointerEvent::up(1, Vec2::new(104.0, 104.0), ms(120))));
        assert_eq!(out, vec![Action::Select(Vec2::new(104.0, 104.0))]);
    }

    #[test]
    fn travel_past_threshold_never_taps() {
        let mut arbiter = GestureArbiter::default();
        let mut out = arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        out.extend(arbiter.handle(PointerEvent::moved(1, Vec2::new(12.0, 0.0), ms(20))));
        out.extend(arbiter.handle(PointerEvent::up(1, Vec2::ZERO, ms(40))));
        assert!(selects(&out).is_empty());
    }

    #[test]
    fn travel_is_cumulative_not_displacement() {
        let mut arbiter = GestureArbiter::default();
        let mut out = arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        for (i, x) in [4.0, 0.0, 4.0].into_iter().enumerate() {
            out.extend(arbiter.handle(PointerEvent::moved(
                1,
                Vec2::new(x, 0.0),
                ms(10 * (i as u64 + 1)),
            )));
        }
        out.extend(arbiter.handle(PointerEvent::up(1, Vec2::ZERO, ms(60))));
        // 4 + 4 + 4 + 4 px of travel while ending at the origin.
        assert!(selects(&out).is_empty());
    }

    #[test]
    fn long_press_is_not_a_tap() {
        let mut arbiter = GestureArbiter::default();
        assert!(tap(&mut arbiter, Vec2::new(5.0, 5.0), 0, 400).is_empty());
        assert_eq!(arbiter.state().phase, GesturePhase::Idle);
    }

    #[test]
    fn taps_inside_debounce_window_collapse() {
        let mut arbiter = GestureArbiter::default();
        let p = Vec2::new(10.0, 10.0);
        assert_eq!(selects(&tap(&mut arbiter, p, 0, 50)).len(), 1);
        assert!(tap(&mut arbiter, p, 100, 200).is_empty());
        // Measured from the last dispatched tap (50 ms), not the suppressed one.
        assert_eq!(selects(&tap(&mut arbiter, p, 300, 350)).len(), 1);
    }

    #[test]
    fn gated_taps_do_not_start_debounce() {
        let mut arbiter = GestureArbiter::default();
        arbiter.set_select_enabled(false);
        assert!(tap(&mut arbiter, Vec2::ONE, 0, 50).is_empty());
        arbiter.set_select_enabled(true);
        assert_eq!(selects(&tap(&mut arbiter, Vec2::ONE, 100, 150)).len(), 1);
    }

    #[test]
    fn drag_orbits_once_threshold_is_crossed() {
        let mut arbiter = GestureArbiter::default();
        arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        assert!(arbiter
            .handle(PointerEvent::moved(1, Vec2::new(4.0, 0.0), ms(10)))
            .is_empty());
        assert_eq!(arbiter.state().phase, GesturePhase::Pressing);

        let out = arbiter.handle(PointerEvent::moved(1, Vec2::new(12.0, 0.0), ms(20)));
        assert_eq!(out, vec![Action::Orbit(Vec2::new(8.0, 0.0))]);
        assert_eq!(arbiter.state().phase, GesturePhase::Dragging);

        let out = arbiter.handle(PointerEvent::moved(1, Vec2::new(15.0, 0.0), ms(30)));
        assert_eq!(out, vec![Action::Orbit(Vec2::new(3.0, 0.0))]);

        assert!(arbiter
            .handle(PointerEvent::up(1, Vec2::new(15.0, 0.0), ms(40)))
            .is_empty());
        assert_eq!(arbiter.state().phase, GesturePhase::Idle);
    }

    #[test]
    fn orbit_gate_silences_manipulation() {
        let mut arbiter = GestureArbiter::default();
        arbiter.set_orbit_enabled(false);
        arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        assert!(arbiter
            .handle(PointerEvent::moved(1, Vec2::new(30.0, 0.0), ms(10)))
            .is_empty());
        assert_eq!(arbiter.state().phase, GesturePhase::Dragging);
    }

    #[test]
    fn second_pointer_cancels_pending_tap() {
        let mut arbiter = GestureArbiter::default();
        let mut out = arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        out.extend(arbiter.handle(PointerEvent::down(2, Vec2::new(50.0, 0.0), ms(10))));
        out.extend(arbiter.handle(PointerEvent::up(2, Vec2::new(50.0, 0.0), ms(30))));
        out.extend(arbiter.handle(PointerEvent::up(1, Vec2::ZERO, ms(40))));
        assert!(selects(&out).is_empty());
        assert_eq!(arbiter.active_pointers(), 0);
    }

    #[test]
    fn pinch_zooms_and_pans() {
        let mut arbiter = GestureArbiter::default();
        arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        arbiter.handle(PointerEvent::down(2, Vec2::new(100.0, 0.0), ms(5)));
        let out = arbiter.handle(PointerEvent::moved(2, Vec2::new(200.0, 0.0), ms(20)));
        assert_eq!(
            out,
            vec![Action::Zoom(2.0), Action::Pan(Vec2::new(50.0, 0.0))]
        );
    }

    #[test]
    fn remaining_finger_keeps_orbiting_after_pinch() {
        let mut arbiter = GestureArbiter::default();
        arbiter.handle(PointerEvent::down(1, Vec2::ZERO, ms(0)));
        arbiter.handle(PointerEvent::down(2, Vec2::new(100.0, 0.0), ms(5)));
        arbiter.handle(PointerEvent::up(1, Vec2::ZERO, ms(20)));
        let out = arbiter.handle(PointerEvent::moved(2, Vec2::new(100.0, 5.0), ms(30)));
        assert_eq!(out, vec![Action::Orbit(Vec2::new(0.0, 5.0))]);
    }

    #[test]
    fn cancel_resets_and_later_release_is_ignored() {
        let mut arbiter = GestureArbiter::default();
        arbiter.handle(PointerEvent::down(1, Vec2::ONE, ms(0)));
        arbiter.handle(PointerEvent::cancel(1, Vec2::ONE, ms(10)));
        assert_eq!(arbiter.state().phase, GesturePhase::Idle);
        assert!(arbiter
            .handle(PointerEvent::up(1, Vec2::ONE, ms(20)))
            .is_empty());
    }

    #[test]
    fn hover_moves_are_ignored() {
        let mut arbiter = GestureArbiter::default();
        assert!(arbiter
            .handle(PointerEvent::moved(7, Vec2::new(40.0, 40.0), ms(0)))
            .is_empty());
        assert_eq!(arbiter.state().phase, GesturePhase::Idle);
    }

    #[test]
    fn state_records_press_bookkeeping() {
        let mut arbiter = GestureArbiter::default();
        arbiter.handle(PointerEvent::down(3, Vec2::new(2.0, 3.0), ms(7)));
        let state = arbiter.state();
        assert_eq!(state.phase, GesturePhase::Pressing);
        assert_eq!(state.pointer, Some(PointerId(3)));
        assert_eq!(state.press_origin, Some(Vec2::new(2.0, 3.0)));
        assert_eq!(state.press_started, Some(ms(7)));
        assert_eq!(state.last_event_timestamp, Some(ms(7)));
    }

    #[test]
    fn config_fields_default_individually() {
        let config: GestureConfig = serde_yaml::from_str("drag_threshold_px: 20.0\n").unwrap();
        assert_eq!(config.drag_threshold_px, 20.0);
        assert_eq!(config.max_tap_duration(), ms(350));
        assert_eq!(config.debounce(), ms(300));
    }
}
