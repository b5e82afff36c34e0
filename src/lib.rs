//! Cache and telemetry store for AI plugin gateways
//!
//! SQLite-backed storage for the data a plugin gateway accumulates:
//! - Cached request/response pairs, keyed per plugin
//! - Per-request performance metrics
//! - Structured log records
//! - Plugin configuration rows (feature flags, rate limits, JSON config)
//!
//! Maintenance (age-based cache cleanup, retention purges) runs as an
//! explicit pass or as a periodic background task, not as a side effect
//! of the write path.

pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod maintenance;

pub use cache::CacheStore;
pub use config::StoreConfig;
pub use database::models::{
    CacheEntry, CacheStatistics, LogLevel, LogRecord, PerformanceRecord, PluginConfig,
    PluginMetrics,
};
pub use database::Database;
pub use errors::{StoreError, StoreResult};
pub use maintenance::{run_maintenance, spawn_maintenance_task, MaintenanceReport};
