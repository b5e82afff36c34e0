//! Store configuration - schemas, defaults, and TOML loading
//!
//! All tunables live here: database location, cache gate and retention
//! windows, the maintenance threshold, and the plugin seeding list applied
//! at deployment time. Thresholds and retention windows are configuration,
//! not invariants; the defaults match the original deployment values.

mod macros;

use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/pluginstore.toml";

// ============================================================================
// CONFIGURATION SCHEMAS
// ============================================================================

crate::config_struct! {
    /// Database location settings
    pub struct DatabaseSettings {
        path: String = "data/pluginstore.db".to_string(),
    }
}

crate::config_struct! {
    /// Cache behavior settings
    pub struct CacheSettings {
        /// Global cache gate: when false, gets miss and puts are dropped
        enabled: bool = true,

        /// Entries older than this are removed by maintenance
        retention_days: u32 = 30,
    }
}

crate::config_struct! {
    /// Retention windows for append-only telemetry tables
    pub struct RetentionSettings {
        performance_days: u32 = 90,
        log_days: u32 = 60,
    }
}

crate::config_struct! {
    /// Maintenance pass settings
    pub struct MaintenanceSettings {
        /// Cache cleanup runs only once the metrics table grows past this
        performance_row_threshold: u64 = 100_000,

        /// Interval for the periodic maintenance task
        interval_secs: u64 = 3600,
    }
}

/// Plugin row seeded into `plugin_configs` at deployment time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSeed {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
    #[serde(default = "default_enabled")]
    pub cache_enabled: bool,
    /// Plugin-specific config blob, stored as JSON
    #[serde(default = "default_plugin_config")]
    pub config: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

fn default_rate_limit() -> i64 {
    20
}

fn default_plugin_config() -> serde_json::Value {
    serde_json::json!({})
}

impl PluginSeed {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: default_enabled(),
            rate_limit_per_minute: default_rate_limit(),
            cache_enabled: default_enabled(),
            config: default_plugin_config(),
        }
    }

    /// Seed rows for the stock gateway plugins
    pub fn gateway_defaults() -> Vec<Self> {
        vec![
            Self {
                config: serde_json::json!({ "model": "gpt-4", "max_tokens": 1000 }),
                ..Self::new("chatgpt")
            },
            Self {
                config: serde_json::json!({ "width": 1024, "height": 1024, "steps": 4 }),
                ..Self::new("flux")
            },
            Self {
                config: serde_json::json!({ "voice": "default", "format": "wav" }),
                ..Self::new("chatterbox")
            },
        ]
    }
}

crate::config_struct! {
    /// Top-level store configuration
    pub struct StoreConfig {
        database: DatabaseSettings = DatabaseSettings::default(),
        cache: CacheSettings = CacheSettings::default(),
        retention: RetentionSettings = RetentionSettings::default(),
        maintenance: MaintenanceSettings = MaintenanceSettings::default(),
        plugins: Vec<PluginSeed> = PluginSeed::gateway_defaults(),
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl StoreConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn load_from_path(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            log::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| StoreError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Write the configuration as pretty TOML, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> StoreResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StoreError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.cache.retention_days, 30);
        assert_eq!(config.retention.performance_days, 90);
        assert_eq!(config.retention.log_days, 60);
        assert_eq!(config.maintenance.performance_row_threshold, 100_000);
        assert_eq!(config.plugins.len(), 3);
        assert_eq!(config.plugins[0].name, "chatgpt");
        assert_eq!(config.plugins[0].rate_limit_per_minute, 20);
    }

    #[test]
    fn test_config_serialization() {
        let config = StoreConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[retention]"));
        assert!(toml_str.contains("[[plugins]]"));
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let parsed: StoreConfig = toml::from_str("[cache]\nretention_days = 7\n").unwrap();
        assert_eq!(parsed.cache.retention_days, 7);
        assert!(parsed.cache.enabled);
        assert_eq!(parsed.maintenance.performance_row_threshold, 100_000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.cache.retention_days, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        let mut config = StoreConfig::default();
        config.cache.enabled = false;
        config.save_to_path(&path).unwrap();

        let reloaded = StoreConfig::load_from_path(&path).unwrap();
        assert!(!reloaded.cache.enabled);
        assert_eq!(reloaded.plugins.len(), 3);
    }
}
