//! Performance metrics recording and aggregation
//!
//! One append-only row per processed request; aggregation is a single
//! windowed query per plugin.

use crate::database::models::{PerformanceRecord, PluginMetrics};
use crate::database::Database;
use crate::errors::StoreResult;
use chrono::Utc;
use rusqlite::params;

/// Round a ratio to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Database {
    /// Append one performance record
    pub fn record_performance(&self, record: &PerformanceRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let metadata = match &record.metadata {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        conn.execute(
            "INSERT INTO performance_metrics
                (recorded_at, plugin_name, endpoint, user_id, processing_time_ms,
                 cache_hit, tokens_used, response_bytes, success, error_type, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.recorded_at.to_rfc3339(),
                record.plugin_name,
                record.endpoint,
                record.user_id,
                record.processing_time_ms,
                record.cache_hit,
                record.tokens_used,
                record.response_bytes,
                record.success,
                record.error_type,
                metadata
            ],
        )?;
        Ok(())
    }

    /// Aggregate request metrics for one plugin over the trailing window
    ///
    /// An empty window yields zero total requests and `None` rates rather
    /// than a division-by-zero failure.
    pub fn plugin_performance_metrics(
        &self,
        plugin_name: &str,
        hours_back: u32,
    ) -> StoreResult<PluginMetrics> {
        let conn = self.conn.lock().unwrap();
        let cutoff = Utc::now() - chrono::Duration::hours(hours_back as i64);

        let (total, hits, errors, avg_ms, unique_users) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(cache_hit), 0),
                    COALESCE(SUM(CASE WHEN success THEN 0 ELSE 1 END), 0),
                    AVG(processing_time_ms),
                    COUNT(DISTINCT user_id)
             FROM performance_metrics
             WHERE plugin_name = ?1 AND recorded_at >= ?2",
            params![plugin_name, cutoff.to_rfc3339()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )?;

        if total == 0 {
            return Ok(PluginMetrics {
                total_requests: 0,
                cache_hit_rate: None,
                avg_processing_time_ms: None,
                error_rate: None,
                unique_users: 0,
            });
        }

        Ok(PluginMetrics {
            total_requests: total,
            cache_hit_rate: Some(round2(hits as f64 / total as f64)),
            avg_processing_time_ms: avg_ms.map(round2),
            error_rate: Some(round2(errors as f64 / total as f64)),
            unique_users,
        })
    }

    /// Total rows in the metrics table (feeds the cleanup threshold)
    pub fn performance_row_count(&self) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM performance_metrics", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    /// Every plugin name that appears in the metrics table
    pub fn distinct_plugin_names(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT plugin_name FROM performance_metrics ORDER BY plugin_name",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    /// Delete metrics rows older than the retention window
    pub fn purge_old_performance(&self, days_old: u32) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let cutoff = Utc::now() - chrono::Duration::days(days_old as i64);
        let deleted = conn.execute(
            "DELETE FROM performance_metrics WHERE recorded_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted as u64)
    }
}
