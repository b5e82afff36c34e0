//! SQLite persistence for the plugin gateway store
//!
//! One database file holds four tables:
//! - `cache_entries`: memoized request/response pairs, unique per
//!   `(plugin_name, cache_key)`
//! - `performance_metrics`: one append-only row per processed request
//! - `plugin_logs`: append-only structured log records
//! - `plugin_configs`: one row per plugin (flags, rate limit, JSON config)
//!
//! Timestamps are stored as RFC 3339 text in UTC. JSON payloads are stored
//! as serialized TEXT columns.

pub mod cache;
pub mod configs;
pub mod logs;
pub mod metrics;
pub mod models;
pub mod stats;

use crate::config::StoreConfig;
use crate::errors::StoreResult;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle to the store database
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (tests and throwaway runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Configure connection for concurrent short-lived transactions
    fn configure(conn: &Connection) -> rusqlite::Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(10_000))?;
        Ok(())
    }

    /// Create tables and indexes, then seed plugin configuration rows
    ///
    /// Idempotent: safe to run on every deployment. Seeding never
    /// overwrites an existing plugin row.
    pub fn initialize(&self, config: &StoreConfig) -> StoreResult<()> {
        log::info!("Initializing store schema...");
        self.create_schema()?;

        for seed in &config.plugins {
            self.seed_plugin_config(seed)?;
        }

        log::info!(
            "Store schema ready, {} plugin(s) seeded",
            config.plugins.len()
        );
        Ok(())
    }

    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // Cache entries (one table for all plugins, keyed by plugin_name)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plugin_name TEXT NOT NULL,
                cache_key TEXT NOT NULL,
                request_data TEXT NOT NULL,
                response_data TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                accessed_at TEXT NOT NULL,
                UNIQUE(plugin_name, cache_key)
            )",
            [],
        )?;

        // Performance metrics (append-only, one row per processed request)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS performance_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at TEXT NOT NULL,
                plugin_name TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                user_id TEXT NOT NULL,
                processing_time_ms REAL NOT NULL,
                cache_hit INTEGER NOT NULL DEFAULT 0,
                tokens_used INTEGER,
                response_bytes INTEGER,
                success INTEGER NOT NULL DEFAULT 1,
                error_type TEXT,
                metadata TEXT
            )",
            [],
        )?;

        // Structured log records (append-only)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS plugin_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                logged_at TEXT NOT NULL,
                level TEXT NOT NULL,
                plugin_name TEXT,
                user_id TEXT,
                message TEXT NOT NULL,
                metadata TEXT,
                request_id TEXT
            )",
            [],
        )?;

        // Plugin configuration (one row per plugin name)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS plugin_configs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plugin_name TEXT UNIQUE NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                config TEXT NOT NULL DEFAULT '{}',
                rate_limit_per_minute INTEGER NOT NULL DEFAULT 20,
                cache_enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Indexes for lookup and cleanup paths
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_plugin_key
             ON cache_entries(plugin_name, cache_key)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_plugin_user
             ON cache_entries(plugin_name, user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_created
             ON cache_entries(plugin_name, created_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_metrics_plugin_time
             ON performance_metrics(plugin_name, recorded_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_logs_plugin_time
             ON plugin_logs(plugin_name, logged_at)",
            [],
        )?;

        Ok(())
    }

    /// Raw connection access for test fixtures outside this module
    #[cfg(test)]
    pub(crate) fn conn_for_tests(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
