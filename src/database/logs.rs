//! Structured log records
//!
//! Append-only table written by the gateway and by the store's own
//! maintenance and config-audit paths.

use crate::database::models::{parse_json, parse_ts, LogLevel, LogRecord};
use crate::database::Database;
use crate::errors::StoreResult;
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Append a log record
    pub fn append_log(&self, record: &LogRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let metadata = match &record.metadata {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        conn.execute(
            "INSERT INTO plugin_logs
                (logged_at, level, plugin_name, user_id, message, metadata, request_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.logged_at.to_rfc3339(),
                record.level.as_str(),
                record.plugin_name,
                record.user_id,
                record.message,
                metadata,
                record.request_id
            ],
        )?;
        Ok(())
    }

    /// Convenience wrapper for store-internal log rows
    pub fn log_event(
        &self,
        level: LogLevel,
        plugin_name: Option<&str>,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> StoreResult<()> {
        let mut record = LogRecord::new(level, message);
        record.plugin_name = plugin_name.map(str::to_string);
        record.metadata = metadata;
        self.append_log(&record)
    }

    /// Most recent log records, newest first, optionally for one plugin
    pub fn recent_logs(&self, plugin_name: Option<&str>, limit: u32) -> StoreResult<Vec<LogRecord>> {
        let conn = self.conn.lock().unwrap();

        let (sql, filter) = match plugin_name {
            Some(name) => (
                "SELECT logged_at, level, plugin_name, user_id, message, metadata, request_id
                 FROM plugin_logs WHERE plugin_name = ?1
                 ORDER BY logged_at DESC LIMIT ?2",
                Some(name),
            ),
            None => (
                "SELECT logged_at, level, plugin_name, user_id, message, metadata, request_id
                 FROM plugin_logs ORDER BY logged_at DESC LIMIT ?1",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<LogRecord> {
            let metadata = match row.get::<_, Option<String>>(5)? {
                Some(raw) => Some(parse_json(5, &raw)?),
                None => None,
            };
            Ok(LogRecord {
                logged_at: parse_ts(0, &row.get::<_, String>(0)?)?,
                level: LogLevel::from_str(&row.get::<_, String>(1)?),
                plugin_name: row.get(2)?,
                user_id: row.get(3)?,
                message: row.get(4)?,
                metadata,
                request_id: row.get(6)?,
            })
        };

        let rows = match filter {
            Some(name) => stmt.query_map(params![name, limit], map_row)?,
            None => stmt.query_map(params![limit], map_row)?,
        };

        let mut logs = Vec::new();
        for record in rows {
            logs.push(record?);
        }
        Ok(logs)
    }

    /// Delete log records older than the retention window
    pub fn purge_old_logs(&self, days_old: u32) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let cutoff = Utc::now() - chrono::Duration::days(days_old as i64);
        let deleted = conn.execute(
            "DELETE FROM plugin_logs WHERE logged_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted as u64)
    }
}
