//! Plugin configuration rows
//!
//! One row per plugin name. Seeding happens at deployment and never
//! overwrites; updates are partial with last-writer-wins semantics and an
//! audit log entry on success.

use crate::config::PluginSeed;
use crate::database::models::{parse_json, parse_ts, LogLevel, PluginConfig};
use crate::database::Database;
use crate::errors::StoreResult;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

fn map_config_row(row: &Row<'_>) -> rusqlite::Result<PluginConfig> {
    Ok(PluginConfig {
        plugin_name: row.get(0)?,
        enabled: row.get(1)?,
        config: parse_json(2, &row.get::<_, String>(2)?)?,
        rate_limit_per_minute: row.get(3)?,
        cache_enabled: row.get(4)?,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
        updated_at: parse_ts(6, &row.get::<_, String>(6)?)?,
    })
}

const CONFIG_COLUMNS: &str = "plugin_name, enabled, config, rate_limit_per_minute, \
                              cache_enabled, created_at, updated_at";

impl Database {
    /// Insert a plugin configuration row if none exists for the name
    pub fn seed_plugin_config(&self, seed: &PluginSeed) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR IGNORE INTO plugin_configs
                (plugin_name, enabled, config, rate_limit_per_minute,
                 cache_enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                seed.name,
                seed.enabled,
                serde_json::to_string(&seed.config)?,
                seed.rate_limit_per_minute,
                seed.cache_enabled,
                now
            ],
        )?;
        Ok(())
    }

    /// Fetch one plugin's configuration
    pub fn get_plugin_config(&self, plugin_name: &str) -> StoreResult<Option<PluginConfig>> {
        let conn = self.conn.lock().unwrap();
        let config = conn
            .query_row(
                &format!(
                    "SELECT {} FROM plugin_configs WHERE plugin_name = ?1",
                    CONFIG_COLUMNS
                ),
                params![plugin_name],
                map_config_row,
            )
            .optional()?;
        Ok(config)
    }

    /// All plugin configurations, ordered by name
    pub fn list_plugin_configs(&self) -> StoreResult<Vec<PluginConfig>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM plugin_configs ORDER BY plugin_name",
            CONFIG_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_config_row)?;

        let mut configs = Vec::new();
        for config in rows {
            configs.push(config?);
        }
        Ok(configs)
    }

    /// Partial configuration update
    ///
    /// Omitted fields keep their previous values; `updated_at` is stamped
    /// on every applied update. Returns false (and writes no audit log)
    /// when no row matches the plugin name.
    pub fn update_plugin_config(
        &self,
        plugin_name: &str,
        config: Option<&serde_json::Value>,
        rate_limit_per_minute: Option<i64>,
        enabled: Option<bool>,
    ) -> StoreResult<bool> {
        let updated = {
            let conn = self.conn.lock().unwrap();
            let config_json = match config {
                Some(value) => Some(serde_json::to_string(value)?),
                None => None,
            };

            conn.execute(
                "UPDATE plugin_configs SET
                    config = COALESCE(?2, config),
                    rate_limit_per_minute = COALESCE(?3, rate_limit_per_minute),
                    enabled = COALESCE(?4, enabled),
                    updated_at = ?5
                 WHERE plugin_name = ?1",
                params![
                    plugin_name,
                    config_json,
                    rate_limit_per_minute,
                    enabled,
                    Utc::now().to_rfc3339()
                ],
            )?
        };

        if updated == 0 {
            return Ok(false);
        }

        let changed: Vec<&str> = [
            config.map(|_| "config"),
            rate_limit_per_minute.map(|_| "rate_limit_per_minute"),
            enabled.map(|_| "enabled"),
        ]
        .into_iter()
        .flatten()
        .collect();

        self.log_event(
            LogLevel::Info,
            Some(plugin_name),
            "Plugin configuration updated",
            Some(serde_json::json!({ "fields": changed })),
        )?;

        Ok(true)
    }
}
