use glam::{Vec2, Vec3};
use keyscape_assets::{LoadStatus, ModelLoader};
use keyscape_common::{NodeId, Transform, Viewport};
use keyscape_input::{Action, GestureArbiter, PointerEvent};
use keyscape_keycaps::{KeycapRegistry, LogicalKey};
use keyscape_render::{
    Camera, CameraController, CameraMode, SelectionFeedback, hit_test, keycap_candidates,
};
use keyscape_scene::{Light, Node, SceneGraph};
use std::collections::VecDeque;
use std::time::Duration;

use crate::StageError;
use crate::config::StageConfig;

/// Receives the logical key of every confirmed, mapped tap.
pub type KeyPressHandler = Box<dyn FnMut(LogicalKey)>;

/// `(name, position, intensity)` of the directional lights.
const DIRECTIONAL_LIGHTS: [(&str, Vec3, f32); 3] = [
    ("key_light", Vec3::new(10.0, 10.0, 10.0), 2.0),
    ("fill_light", Vec3::new(-10.0, 10.0, 10.0), 1.5),
    ("under_light", Vec3::new(0.0, -5.0, 10.0), 1.2),
];

/// The interactive keyboard scene and everything that acts on it.
///
/// Pointer events are classified immediately but their effects are queued
/// and applied by the next [`Stage::frame`], so the camera, the scene and
/// the highlight timers only ever change inside a frame.
pub struct Stage {
    config: StageConfig,
    scene: SceneGraph,
    registry: KeycapRegistry,
    camera: Camera,
    controller: CameraController,
    arbiter: GestureArbiter,
    feedback: SelectionFeedback,
    candidates: Vec<NodeId>,
    model_root: Option<NodeId>,
    loader: Option<ModelLoader>,
    viewport: Option<Viewport>,
    queued: VecDeque<Action>,
    on_key_press: Option<KeyPressHandler>,
    clock: Duration,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("nodes", &self.scene.len())
            .field("mode", &self.controller.mode())
            .field("keycaps", &self.candidates.len())
            .field("viewport", &self.viewport)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Stage {
    pub fn new(config: StageConfig, registry: KeycapRegistry) -> Result<Self, StageError> {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        scene.add(root, Node::new("ambient_light").with_light(Light::Ambient { intensity: 1.0 }))?;
        for (name, position, intensity) in DIRECTIONAL_LIGHTS {
            scene.add(
                root,
                Node::new(name)
                    .with_transform(Transform::from_position(position))
                    .with_light(Light::Directional { intensity }),
            )?;
        }

        let mut stage = Self {
            controller: CameraController::new(config.camera.clone()),
            arbiter: GestureArbiter::new(config.gesture.clone()),
            feedback: SelectionFeedback::new(config.feedback.clone()),
            config,
            scene,
            registry,
            camera: Camera::default(),
            candidates: Vec::new(),
            model_root: None,
            loader: None,
            viewport: None,
            queued: VecDeque::new(),
            on_key_press: None,
            clock: Duration::ZERO,
        };
        stage.apply_gates();
        Ok(stage)
    }

    /// Build from a config, including its extra key bindings.
    pub fn from_config(config: StageConfig) -> Result<Self, StageError> {
        let registry = config.registry()?;
        Self::new(config, registry)
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn registry(&self) -> &KeycapRegistry {
        &self.registry
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controller(&self) -> &CameraController {
        &self.controller
    }

    pub fn arbiter(&self) -> &GestureArbiter {
        &self.arbiter
    }

    pub fn feedback(&self) -> &SelectionFeedback {
        &self.feedback
    }

    /// Keycap nodes taps are tested against.
    pub fn candidates(&self) -> &[NodeId] {
        &self.candidates
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Time accumulated by [`Stage::frame`].
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn has_model(&self) -> bool {
        self.model_root.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }

    /// Copy a parsed model into the stage under a `model` group, replacing
    /// any previous model.
    pub fn attach_model(&mut self, model: &SceneGraph) -> Result<NodeId, StageError> {
        let root = self.scene.root();
        if let Some(old) = self.model_root.take() {
            self.scene.remove(old)?;
            self.candidates.clear();
        }
        let group = self.scene.add(root, Node::new("model"))?;
        self.scene.graft(group, model)?;
        self.model_root = Some(group);

        self.candidates = keycap_candidates(&self.scene, group, &self.registry);
        if self.candidates.is_empty() {
            tracing::warn!("model has no registered keycaps, taps will test every mesh");
        }
        tracing::info!(
            nodes = model.len(),
            keycaps = self.candidates.len(),
            "model attached"
        );
        Ok(group)
    }

    /// Hand over a background load. Polled at the start of every frame.
    pub fn attach_loader(&mut self, loader: ModelLoader) {
        tracing::debug!(source = %loader.source(), "waiting for model");
        self.loader = Some(loader);
    }

    /// The view has been laid out; taps are interpreted against `viewport`.
    pub fn viewport_ready(&mut self, viewport: Viewport) {
        if viewport.is_degenerate() {
            tracing::warn!(?viewport, "degenerate viewport, taps will not hit");
        }
        self.camera.aspect = viewport.aspect();
        self.viewport = Some(viewport);
    }

    pub fn on_key_press(&mut self, handler: impl FnMut(LogicalKey) + 'static) {
        self.on_key_press = Some(Box::new(handler));
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let actions = self.arbiter.handle(event);
        self.queued.extend(actions);
    }

    /// Queue an action that did not come from pointer input, such as the
    /// host's zoom button.
    pub fn dispatch(&mut self, action: Action) {
        self.queued.push_back(action);
    }

    pub fn mode(&self) -> CameraMode {
        self.controller.mode()
    }

    pub fn set_focused(&mut self, focused: bool) {
        let mode = if focused {
            CameraMode::Focused
        } else {
            CameraMode::Overview
        };
        self.controller.set_mode(mode);
        self.apply_gates();
    }

    pub fn toggle_focus(&mut self) -> CameraMode {
        let mode = self.controller.toggle();
        self.apply_gates();
        mode
    }

    /// Advance by `dt` seconds. Returns the keys pressed during this frame.
    pub fn frame(&mut self, dt: f32) -> Vec<LogicalKey> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += Duration::try_from_secs_f32(dt).unwrap_or_default();
        self.poll_loader();

        let mut pressed = Vec::new();
        while let Some(action) = self.queued.pop_front() {
            match action {
                Action::Orbit(delta) => self.controller.orbit(delta),
                Action::Zoom(factor) => self.controller.zoom(factor),
                Action::Pan(delta) => self.controller.pan(delta),
                Action::ToggleFocus => {
                    self.toggle_focus();
                }
                Action::Select(point) => pressed.extend(self.select(point)),
            }
        }

        self.controller.update(dt, &mut self.camera);
        self.feedback.tick(&mut self.scene, self.clock);
        pressed
    }

    fn select(&mut self, point: Vec2) -> Option<LogicalKey> {
        let Some(viewport) = self.viewport else {
            tracing::debug!("tap before viewport is ready");
            return None;
        };
        if self.model_root.is_none() {
            tracing::debug!("tap before model is attached");
            return None;
        }
        let hit = hit_test(
            point,
            &viewport,
            &self.camera,
            &self.scene,
            &self.candidates,
            &self.registry,
        )?;
        let Some(key) = hit.logical_key else {
            tracing::debug!(node = %hit.hit_node, "tap on unmapped node");
            return None;
        };

        self.feedback.highlight(&mut self.scene, hit.hit_node, self.clock);
        tracing::info!(key = key.tag(), "key pressed");
        if let Some(handler) = self.on_key_press.as_mut() {
            handler(key);
        }
        Some(key)
    }

    fn poll_loader(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        match loader.poll() {
            LoadStatus::Pending => {}
            LoadStatus::Ready(model) => {
                self.loader = None;
                if let Err(e) = self.attach_model(&model) {
                    tracing::error!("cannot attach model: {e}");
                }
            }
            LoadStatus::Failed(e) => {
                tracing::error!(
                    source = %loader.source(),
                    "model load failed, stage stays empty: {e}"
                );
                self.loader = None;
            }
            LoadStatus::Taken => self.loader = None,
        }
    }

    fn apply_gates(&mut self) {
        let mode = self.controller.mode();
        self.arbiter.set_orbit_enabled(mode == CameraMode::Overview);
        self.arbiter
            .set_select_enabled(mode == CameraMode::Focused || self.config.select_in_overview);
        tracing::debug!(
            ?mode,
            select = self.arbiter.select_enabled(),
            orbit = self.arbiter.orbit_enabled(),
            "gesture gates updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_keyboard;
    use keyscape_assets::{AssetResolver, ModelSource};
    use keyscape_common::Rgb;
    use keyscape_render::HIGHLIGHT_COLOR;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    const DT: f32 = 1.0 / 60.0;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn ready_stage(config: StageConfig) -> (Stage, Rc<RefCell<Vec<LogicalKey>>>) {
        let mut stage = Stage::new(config, KeycapRegistry::default()).unwrap();
        stage.attach_model(&demo_keyboard().unwrap()).unwrap();
        stage.viewport_ready(Viewport::sized(390.0, 844.0));
        let presses = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&presses);
        stage.on_key_press(move |key| sink.borrow_mut().push(key));
        (stage, presses)
    }

    fn tap(stage: &mut Stage, at: Vec2, start_ms: u64) {
        stage.handle_pointer(PointerEvent::down(1, at, ms(start_ms)));
        stage.handle_pointer(PointerEvent::up(1, at, ms(start_ms + 60)));
    }

    fn centre(stage: &Stage) -> Vec2 {
        stage.viewport().unwrap().center()
    }

    #[test]
    fn lights_are_created() {
        let stage = Stage::new(StageConfig::default(), KeycapRegistry::default()).unwrap();
        let scene = stage.scene();
        let lights: Vec<_> = scene
            .traverse()
            .into_iter()
            .filter_map(|id| scene.get(id).and_then(|n| n.light))
            .collect();
        assert_eq!(lights.len(), 4);
        assert!(lights.contains(&Light::Ambient { intensity: 1.0 }));
        let key = scene.find_by_name("key_light").unwrap();
        assert_eq!(
            scene.get(key).unwrap().transform.position,
            Vec3::new(10.0, 10.0, 10.0)
        );
    }

    #[test]
    fn focused_centre_tap_presses_python_once() {
        let (mut stage, presses) = ready_stage(StageConfig::default());
        stage.set_focused(true);
        stage.frame(DT);

        let at = centre(&stage);
        tap(&mut stage, at, 1000);
        let pressed = stage.frame(DT);
        assert_eq!(pressed, vec![LogicalKey::Python]);
        assert_eq!(*presses.borrow(), vec![LogicalKey::Python]);
    }

    #[test]
    fn overview_tap_is_gated_off() {
        let (mut stage, presses) = ready_stage(StageConfig::default());
        stage.frame(DT);
        assert!(!stage.arbiter().select_enabled());
        assert!(stage.arbiter().orbit_enabled());

        let at = centre(&stage);
        tap(&mut stage, at, 1000);
        assert!(stage.frame(DT).is_empty());
        assert!(presses.borrow().is_empty());
    }

    #[test]
    fn select_in_overview_opens_the_gate() {
        let config = StageConfig {
            select_in_overview: true,
            ..StageConfig::default()
        };
        let (stage, _) = ready_stage(config);
        assert!(stage.arbiter().select_enabled());
        assert!(stage.arbiter().orbit_enabled());
    }

    #[test]
    fn rapid_double_tap_presses_once() {
        let (mut stage, presses) = ready_stage(StageConfig::default());
        stage.set_focused(true);
        stage.frame(DT);

        let at = centre(&stage);
        tap(&mut stage, at, 1000);
        tap(&mut stage, at, 1100);
        stage.frame(DT);
        assert_eq!(presses.borrow().len(), 1);
    }

    #[test]
    fn pressed_key_flashes_then_reverts() {
        let (mut stage, _) = ready_stage(StageConfig::default());
        stage.set_focused(true);
        stage.frame(DT);

        let at = centre(&stage);
        tap(&mut stage, at, 1000);
        stage.frame(DT);
        let legend = stage.scene().find_by_name("Cube035_2").unwrap();
        assert_eq!(stage.scene().emissive(legend), Some(HIGHLIGHT_COLOR));

        for _ in 0..15 {
            stage.frame(DT);
        }
        assert_eq!(stage.scene().emissive(legend), Some(Rgb::BLACK));
        assert_eq!(stage.feedback().pending(), 0);
    }

    #[test]
    fn taps_wait_for_viewport_and_model() {
        let mut stage = Stage::new(StageConfig::default(), KeycapRegistry::default()).unwrap();
        stage.set_focused(true);
        stage.frame(DT);
        tap(&mut stage, Vec2::new(195.0, 422.0), 1000);
        assert!(stage.frame(DT).is_empty());

        stage.viewport_ready(Viewport::sized(390.0, 844.0));
        tap(&mut stage, Vec2::new(195.0, 422.0), 2000);
        assert!(stage.frame(DT).is_empty());

        stage.attach_model(&demo_keyboard().unwrap()).unwrap();
        tap(&mut stage, Vec2::new(195.0, 422.0), 3000);
        assert_eq!(stage.frame(DT), vec![LogicalKey::Python]);
    }

    #[test]
    fn drag_in_overview_turns_camera() {
        let (mut stage, _) = ready_stage(StageConfig::default());
        stage.frame(DT);
        let before = stage.controller().state().angular_phase;

        stage.handle_pointer(PointerEvent::down(1, Vec2::new(100.0, 400.0), ms(0)));
        stage.handle_pointer(PointerEvent::moved(1, Vec2::new(160.0, 400.0), ms(30)));
        stage.handle_pointer(PointerEvent::up(1, Vec2::new(160.0, 400.0), ms(60)));
        stage.frame(0.0);

        let after = stage.controller().state().angular_phase;
        assert!((after - before - 60.0 * 0.005).abs() < 1e-5);
    }

    #[test]
    fn toggle_action_switches_mode_and_gates() {
        let (mut stage, _) = ready_stage(StageConfig::default());
        stage.dispatch(Action::ToggleFocus);
        stage.frame(DT);
        assert_eq!(stage.mode(), CameraMode::Focused);
        assert!(stage.arbiter().select_enabled());
        assert!(!stage.arbiter().orbit_enabled());
    }

    #[test]
    fn attach_model_replaces_previous_model() {
        let (mut stage, _) = ready_stage(StageConfig::default());
        let nodes = stage.scene().len();
        let keycaps = stage.candidates().len();
        stage.attach_model(&demo_keyboard().unwrap()).unwrap();
        assert_eq!(stage.scene().len(), nodes);
        assert_eq!(stage.candidates().len(), keycaps);
        assert_eq!(keycaps, 13);
    }

    fn frame_until_loaded(stage: &mut Stage) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while stage.is_loading() && Instant::now() < deadline {
            stage.frame(DT);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn background_model_is_attached_by_frame() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "nodes": [{"name": "Key_Java", "mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{"componentType": 5126, "count": 8, "type": "VEC3",
                           "min": [-1.0, -1.0, -1.0], "max": [1.0, 1.0, 1.0]}]
        });
        let path = dir.path().join("keyboard.gltf");
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

        let mut stage = Stage::new(StageConfig::default(), KeycapRegistry::default()).unwrap();
        let resolver = AssetResolver::new(dir.path(), dir.path().join("cache"));
        stage.attach_loader(ModelLoader::spawn(resolver, ModelSource::Path(path)));
        assert!(!stage.has_model());

        frame_until_loaded(&mut stage);
        assert!(stage.has_model());
        assert_eq!(stage.candidates().len(), 1);
    }

    #[test]
    fn failed_load_leaves_stage_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = Stage::new(StageConfig::default(), KeycapRegistry::default()).unwrap();
        let resolver = AssetResolver::new(dir.path(), dir.path().join("cache"));
        stage.attach_loader(ModelLoader::spawn(
            resolver,
            ModelSource::Bundled("missing.glb".into()),
        ));
        frame_until_loaded(&mut stage);
        assert!(!stage.is_loading());
        assert!(!stage.has_model());
    }
}
