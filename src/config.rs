//! Process-wide configuration, ingested as already-parsed structured data.
//!
//! Parsing YAML/TOML/JSON into these types is out of this crate's scope (§1); callers hand in
//! already-validated values, optionally deserialized directly via `serde` when the `serde`
//! feature is enabled.

use std::collections::HashMap;

/// Cyclic pipeline and supervisor timing configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct McrConfig {
    /// Tick rate in Hz.
    pub update_rate: f64,
    /// Seconds allowed for all drives to come online and reach SWITCH ON DISABLED during init.
    pub init_timeout: f64,
    /// Seconds allowed for all drives to reach any other commanded goal.
    pub goal_state_timeout: f64,
}

impl Default for McrConfig {
    fn default() -> Self {
        Self {
            update_rate: 10.0,
            init_timeout: 30.0,
            goal_state_timeout: 10.0,
        }
    }
}

/// Per-model device configuration: SDO init list, PDO mapping, sync-manager layout. Opaque to
/// this crate — values are passed through unread to the external configurator.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfigEntry {
    pub model_id: String,
    pub sdo_init: Vec<(u16, u8, u32)>,
    pub pdo_mapping: Vec<String>,
    pub sync_managers: Vec<String>,
}

/// Process-wide registry of [`DeviceConfigEntry`] values, owned by the supervisor and handed to
/// each drive adapter by reference at construction — an explicit value replacing the class
/// attribute the source shared across all model instances.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfigRegistry {
    entries: HashMap<String, DeviceConfigEntry>,
}

impl DeviceConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: DeviceConfigEntry) {
        self.entries.insert(entry.model_id.clone(), entry);
    }

    pub fn get(&self, model_id: &str) -> Option<&DeviceConfigEntry> {
        self.entries.get(model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = McrConfig::default();
        assert_eq!(config.update_rate, 10.0);
        assert_eq!(config.init_timeout, 30.0);
        assert_eq!(config.goal_state_timeout, 10.0);
    }

    #[test]
    fn registry_looks_up_by_model_id() {
        let mut registry = DeviceConfigRegistry::new();
        registry.register(DeviceConfigEntry {
            model_id: "c5e".to_string(),
            sdo_init: vec![(0x6040, 0, 0)],
            pdo_mapping: vec!["status_word".to_string()],
            sync_managers: vec![],
        });
        assert!(registry.get("c5e").is_some());
        assert!(registry.get("unknown").is_none());
    }
}
