use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::key::LogicalKey;

/// One scene node name bound to a logical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub node_name: String,
    pub key: LogicalKey,
}

impl KeyBinding {
    pub fn new(node_name: impl Into<String>, key: LogicalKey) -> Self {
        Self {
            node_name: node_name.into(),
            key,
        }
    }
}

/// Errors from building a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("node {node:?} is bound to both {first} and {second}")]
    ConflictingBinding {
        node: String,
        first: LogicalKey,
        second: LogicalKey,
    },
    #[error("empty node name bound to {0}")]
    EmptyNodeName(LogicalKey),
}

/// Node names of the shipped keyboard model. Both naming schemes used by
/// model exports are listed; the split sub-meshes of a keycap share a key.
const DEFAULT_BINDINGS: &[(&str, LogicalKey)] = &[
    ("Key-HTML5018", LogicalKey::Html5),
    ("Key-CSS026", LogicalKey::Css),
    ("Key-Github017", LogicalKey::Github),
    ("Key-C011", LogicalKey::C),
    ("Key-Python022", LogicalKey::Python),
    ("Key-Typescript028", LogicalKey::Typescript),
    ("Key-React029", LogicalKey::React),
    ("Key-Java016", LogicalKey::Java),
    ("Key-Unity019", LogicalKey::Unity),
    ("Key-CSharp020", LogicalKey::Csharp),
    ("Key-Javascript021", LogicalKey::Javascript),
    ("Cube021_1", LogicalKey::C),
    ("Cube021_2", LogicalKey::C),
    ("Cube035_1", LogicalKey::Python),
    ("Cube035_2", LogicalKey::Python),
    ("Key_C", LogicalKey::C),
    ("Key_Python", LogicalKey::Python),
    ("Key_CSS", LogicalKey::Css),
    ("Key_TypeScript", LogicalKey::Typescript),
    ("Key_React", LogicalKey::React),
    ("Key_Java", LogicalKey::Java),
    ("Key_HTML5", LogicalKey::Html5),
    ("Key_Unity", LogicalKey::Unity),
    ("Key_CSharp", LogicalKey::Csharp),
    ("Key_JavaScript", LogicalKey::Javascript),
    ("Key_GitHub", LogicalKey::Github),
];

/// Immutable mapping from scene node names to logical keys.
///
/// Many-to-one: several node names may resolve to the same key. A name can
/// never resolve to two keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycapRegistry {
    by_name: BTreeMap<String, LogicalKey>,
}

impl KeycapRegistry {
    /// Build a registry. Repeating an identical binding is allowed; binding
    /// one name to two keys is an error.
    pub fn new(bindings: impl IntoIterator<Item = KeyBinding>) -> Result<Self, RegistryError> {
        let mut by_name = BTreeMap::new();
        for binding in bindings {
            insert_binding(&mut by_name, binding)?;
        }
        tracing::debug!(bindings = by_name.len(), "keycap registry built");
        Ok(Self { by_name })
    }

    /// A new registry with extra bindings layered over this one.
    pub fn extended(
        &self,
        bindings: impl IntoIterator<Item = KeyBinding>,
    ) -> Result<Self, RegistryError> {
        let mut by_name = self.by_name.clone();
        for binding in bindings {
            insert_binding(&mut by_name, binding)?;
        }
        Ok(Self { by_name })
    }

    /// Look up the key bound to an exact node name.
    pub fn resolve(&self, node_name: &str) -> Option<LogicalKey> {
        self.by_name.get(node_name).copied()
    }

    pub fn contains(&self, node_name: &str) -> bool {
        self.by_name.contains_key(node_name)
    }

    /// All bindings in name order.
    pub fn bindings(&self) -> impl Iterator<Item = KeyBinding> + '_ {
        self.by_name
            .iter()
            .map(|(name, key)| KeyBinding::new(name.clone(), *key))
    }

    /// Distinct keys reachable through this registry.
    pub fn keys(&self) -> Vec<LogicalKey> {
        let mut keys: Vec<LogicalKey> = self.by_name.values().copied().collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Node names bound to `key`, in name order.
    pub fn names_for(&self, key: LogicalKey) -> Vec<&str> {
        self.by_name
            .iter()
            .filter(|(_, k)| **k == key)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for KeycapRegistry {
    fn default() -> Self {
        let by_name = DEFAULT_BINDINGS
            .iter()
            .map(|(name, key)| (name.to_string(), *key))
            .collect();
        Self { by_name }
    }
}

fn insert_binding(
    by_name: &mut BTreeMap<String, LogicalKey>,
    binding: KeyBinding,
) -> Result<(), RegistryError> {
    if binding.node_name.is_empty() {
        return Err(RegistryError::EmptyNodeName(binding.key));
    }
    match by_name.get(&binding.node_name) {
        Some(existing) if *existing != binding.key => Err(RegistryError::ConflictingBinding {
            node: binding.node_name,
            first: *existing,
            second: binding.key,
        }),
        Some(_) => Ok(()),
        None => {
            by_name.insert(binding.node_name, binding.key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_resolves_shipped_names() {
        let reg = KeycapRegistry::default();
        assert_eq!(reg.resolve("Key-Python022"), Some(LogicalKey::Python));
        assert_eq!(reg.resolve("Cube021_2"), Some(LogicalKey::C));
        assert_eq!(reg.resolve("Key_GitHub"), Some(LogicalKey::Github));
        assert_eq!(reg.resolve("Keyboard_Base"), None);
    }

    #[test]
    fn default_registry_covers_every_key() {
        let reg = KeycapRegistry::default();
        assert_eq!(reg.keys(), LogicalKey::ALL.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn many_names_to_one_key() {
        let reg = KeycapRegistry::default();
        let names = reg.names_for(LogicalKey::Python);
        assert!(names.contains(&"Cube035_1"));
        assert!(names.contains(&"Cube035_2"));
        assert!(names.contains(&"Key-Python022"));
    }

    #[test]
    fn conflicting_binding_rejected() {
        let err = KeycapRegistry::new([
            KeyBinding::new("Key_A", LogicalKey::Java),
            KeyBinding::new("Key_A", LogicalKey::Unity),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::ConflictingBinding { .. }));
    }

    #[test]
    fn duplicate_identical_binding_is_fine() {
        let reg = KeycapRegistry::new([
            KeyBinding::new("Key_A", LogicalKey::Java),
            KeyBinding::new("Key_A", LogicalKey::Java),
        ])
        .unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn empty_name_rejected() {
        assert!(KeycapRegistry::new([KeyBinding::new("", LogicalKey::C)]).is_err());
    }

    #[test]
    fn extended_layers_over_defaults() {
        let reg = KeycapRegistry::default()
            .extended([KeyBinding::new("Key_Rust", LogicalKey::C)])
            .unwrap();
        assert_eq!(reg.resolve("Key_Rust"), Some(LogicalKey::C));
        assert_eq!(reg.len(), KeycapRegistry::default().len() + 1);

        let clash = KeycapRegistry::default()
            .extended([KeyBinding::new("Key_C", LogicalKey::Java)]);
        assert!(clash.is_err());
    }
}
