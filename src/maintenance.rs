//! Store maintenance
//!
//! One pass applies the whole cleanup policy:
//! - When the performance table has grown past the configured threshold,
//!   age-based cache cleanup runs for every plugin seen in that table.
//! - Performance and log rows past their retention windows are always
//!   purged.
//!
//! The pass is invoked explicitly (CLI `maintain`) or from the periodic
//! task spawned by [`spawn_maintenance_task`]; nothing runs on the write
//! path.

use crate::config::StoreConfig;
use crate::database::Database;
use crate::errors::StoreResult;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    /// Whether the performance row threshold tripped cache cleanup
    pub threshold_tripped: bool,
    /// Per-plugin cache entries deleted, when cleanup ran
    pub cache_deleted: Vec<(String, u64)>,
    pub performance_purged: u64,
    pub logs_purged: u64,
}

impl MaintenanceReport {
    pub fn total_cache_deleted(&self) -> u64 {
        self.cache_deleted.iter().map(|(_, n)| n).sum()
    }
}

/// Run one maintenance pass
pub fn run_maintenance(db: &Database, config: &StoreConfig) -> StoreResult<MaintenanceReport> {
    let mut report = MaintenanceReport::default();

    let rows = db.performance_row_count()?;
    report.threshold_tripped = rows > config.maintenance.performance_row_threshold;

    if report.threshold_tripped {
        log::info!(
            "Performance table at {} rows (threshold {}), running cache cleanup",
            rows,
            config.maintenance.performance_row_threshold
        );
        for plugin in db.distinct_plugin_names()? {
            let deleted = db.cleanup_old_cache(&plugin, config.cache.retention_days)?;
            report.cache_deleted.push((plugin, deleted));
        }
    }

    report.performance_purged = db.purge_old_performance(config.retention.performance_days)?;
    report.logs_purged = db.purge_old_logs(config.retention.log_days)?;

    log::info!(
        "Maintenance pass done: {} cache entries, {} metrics rows, {} log rows removed",
        report.total_cache_deleted(),
        report.performance_purged,
        report.logs_purged
    );
    Ok(report)
}

/// Spawn the periodic maintenance task
///
/// Ticks at the configured interval; a failed pass is logged and the
/// loop keeps going.
pub fn spawn_maintenance_task(db: Database, config: StoreConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(
            config.maintenance.interval_secs.max(1),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately
        ticker.tick().await;

        loop {
            if let Err(e) = run_maintenance(&db, &config) {
                log::error!("Maintenance pass failed: {}", e);
            }
            ticker.tick().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::PerformanceRecord;
    use chrono::Utc;
    use serde_json::json;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize(&StoreConfig::default()).unwrap();
        db
    }

    fn small_threshold_config(threshold: u64) -> StoreConfig {
        let mut config = StoreConfig::default();
        config.maintenance.performance_row_threshold = threshold;
        config
    }

    fn record_requests(db: &Database, plugin: &str, count: usize) {
        for i in 0..count {
            db.record_performance(&PerformanceRecord::new(
                plugin,
                "/api/generate",
                &format!("u{}", i),
                10.0,
            ))
            .unwrap();
        }
    }

    #[test]
    fn test_below_threshold_skips_cache_cleanup() {
        let db = test_db();
        record_requests(&db, "chatgpt", 3);

        let report = run_maintenance(&db, &small_threshold_config(10)).unwrap();
        assert!(!report.threshold_tripped);
        assert!(report.cache_deleted.is_empty());
    }

    #[test]
    fn test_exactly_at_threshold_skips_cache_cleanup() {
        let db = test_db();
        record_requests(&db, "chatgpt", 5);

        // Cleanup requires the count to exceed the threshold, not meet it
        let report = run_maintenance(&db, &small_threshold_config(5)).unwrap();
        assert!(!report.threshold_tripped);
        assert!(report.cache_deleted.is_empty());
    }

    #[test]
    fn test_above_threshold_cleans_every_seen_plugin() {
        let db = test_db();
        record_requests(&db, "chatgpt", 2);
        record_requests(&db, "flux", 2);

        // One stale entry per plugin, one fresh entry
        let stale = (Utc::now() - chrono::Duration::days(45)).to_rfc3339();
        for plugin in ["chatgpt", "flux"] {
            db.put_cache(plugin, "fresh", &json!({}), &json!({}), "u1")
                .unwrap();
            let conn = db.conn_for_tests();
            conn.execute(
                "INSERT INTO cache_entries
                    (plugin_name, cache_key, request_data, response_data,
                     user_id, created_at, accessed_at)
                 VALUES (?1, 'stale', '{}', '{}', 'u1', ?2, ?2)",
                rusqlite::params![plugin, stale],
            )
            .unwrap();
        }

        let report = run_maintenance(&db, &small_threshold_config(3)).unwrap();
        assert!(report.threshold_tripped);
        assert_eq!(report.total_cache_deleted(), 2);
        assert_eq!(report.cache_deleted.len(), 2);
        assert!(db.get_cache("chatgpt", "fresh").unwrap().is_some());
        assert!(db.get_cache("chatgpt", "stale").unwrap().is_none());
    }

    #[test]
    fn test_retention_purges_always_run() {
        let db = test_db();
        let old = (Utc::now() - chrono::Duration::days(120)).to_rfc3339();
        {
            let conn = db.conn_for_tests();
            conn.execute(
                "INSERT INTO performance_metrics
                    (recorded_at, plugin_name, endpoint, user_id, processing_time_ms,
                     cache_hit, success)
                 VALUES (?1, 'chatgpt', '/api/generate', 'u1', 10.0, 0, 1)",
                rusqlite::params![old],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO plugin_logs (logged_at, level, message) VALUES (?1, 'info', 'old')",
                rusqlite::params![old],
            )
            .unwrap();
        }

        let report = run_maintenance(&db, &StoreConfig::default()).unwrap();
        assert!(!report.threshold_tripped);
        assert_eq!(report.performance_purged, 1);
        assert_eq!(report.logs_purged, 1);
    }

    #[tokio::test]
    async fn test_periodic_task_runs_a_pass() {
        let db = test_db();
        let old = (Utc::now() - chrono::Duration::days(120)).to_rfc3339();
        {
            let conn = db.conn_for_tests();
            conn.execute(
                "INSERT INTO plugin_logs (logged_at, level, message) VALUES (?1, 'info', 'old')",
                rusqlite::params![old],
            )
            .unwrap();
        }

        let mut config = StoreConfig::default();
        config.maintenance.interval_secs = 3600;
        let handle = spawn_maintenance_task(db.clone(), config);

        // First pass fires immediately; give it a moment
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(db.recent_logs(None, 10).unwrap().is_empty());
    }
}
