use keyscape_input::GestureConfig;
use keyscape_keycaps::{KeyBinding, KeycapRegistry, RegistryError};
use keyscape_render::{CameraConfig, FeedbackConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid key binding: {0}")]
    Registry(#[from] RegistryError),
}

/// Stage settings. Every field may be omitted from the YAML file.
///
/// ```yaml
/// select_in_overview: false
/// camera:
///   stiffness: 3.0
/// gesture:
///   drag_threshold_px: 10.0
/// extra_bindings:
///   - node_name: Key_Rust
///     key: c
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub camera: CameraConfig,
    pub gesture: GestureConfig,
    pub feedback: FeedbackConfig,
    /// Allow tap-to-select while the camera is circling. Off by default:
    /// taps only select in the focused view.
    pub select_in_overview: bool,
    /// Bindings layered over the shipped keyboard's node names.
    pub extra_bindings: Vec<KeyBinding>,
}

impl StageConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), "stage config loaded");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// The default registry extended with `extra_bindings`.
    pub fn registry(&self) -> Result<KeycapRegistry, ConfigError> {
        Ok(KeycapRegistry::default().extended(self.extra_bindings.iter().cloned())?)
    }
}
