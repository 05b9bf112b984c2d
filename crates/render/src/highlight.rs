use keyscape_common::{NodeId, Rgb};
use keyscape_scene::SceneGraph;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const HIGHLIGHT_COLOR: Rgb = Rgb(0x4a9eff);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub color: Rgb,
    pub duration_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            color: HIGHLIGHT_COLOR,
            duration_ms: 200,
        }
    }
}

impl FeedbackConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingRevert {
    node: NodeId,
    original: Rgb,
    due: Duration,
}

/// Short emissive flash on selected keys.
///
/// Reverts are deadline entries drained by [`SelectionFeedback::tick`].
/// Each highlight keeps its own deadline; a node hit again while still lit
/// inherits the colour captured by the earlier entry, so it always ends at
/// its original colour.
#[derive(Debug, Clone, Default)]
pub struct SelectionFeedback {
    config: FeedbackConfig,
    pending: Vec<PendingRevert>,
}

impl SelectionFeedback {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
        }
    }

    /// Light `node` up until `now + duration`. Returns `false` for nodes
    /// without an emissive property.
    pub fn highlight(&mut self, scene: &mut SceneGraph, node: NodeId, now: Duration) -> bool {
        let Some(current) = scene.emissive(node) else {
            tracing::debug!(%node, "node has no emissive colour, highlight skipped");
            return false;
        };
        let original = self
            .pending
            .iter()
            .rev()
            .find(|p| p.node == node)
            .map_or(current, |p| p.original);

        scene.set_emissive(node, self.config.color);
        self.pending.push(PendingRevert {
            node,
            original,
            due: now + self.config.duration(),
        });
        true
    }

    /// Restore every highlight whose deadline has passed. Returns how many
    /// nodes were restored; nodes removed from the scene are dropped.
    pub fn tick(&mut self, scene: &mut SceneGraph, now: Duration) -> usize {
        let mut restored = 0;
        self.pending.retain(|entry| {
            if entry.due > now {
                return true;
            }
            if scene.set_emissive(entry.node, entry.original) {
                restored += 1;
            } else {
                tracing::debug!(node = %entry.node, "highlighted node is gone, revert skipped");
            }
            false
        });
        restored
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
