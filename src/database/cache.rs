//! Cache entry storage
//!
//! Get refreshes `accessed_at`, put is an upsert on
//! `(plugin_name, cache_key)` so a key can never occupy two rows.

use crate::database::models::{parse_json, parse_ts, CacheEntry, LogLevel};
use crate::database::Database;
use crate::errors::StoreResult;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

fn map_cache_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        plugin_name: row.get(0)?,
        cache_key: row.get(1)?,
        request_data: parse_json(2, &row.get::<_, String>(2)?)?,
        response_data: parse_json(3, &row.get::<_, String>(3)?)?,
        user_id: row.get(4)?,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
        accessed_at: parse_ts(6, &row.get::<_, String>(6)?)?,
    })
}

impl Database {
    /// Look up a cache entry, refreshing `accessed_at` on hit
    pub fn get_cache(&self, plugin_name: &str, cache_key: &str) -> StoreResult<Option<CacheEntry>> {
        let conn = self.conn.lock().unwrap();

        let touched = conn.execute(
            "UPDATE cache_entries SET accessed_at = ?1
             WHERE plugin_name = ?2 AND cache_key = ?3",
            params![Utc::now().to_rfc3339(), plugin_name, cache_key],
        )?;
        if touched == 0 {
            return Ok(None);
        }

        let entry = conn
            .query_row(
                "SELECT plugin_name, cache_key, request_data, response_data,
                        user_id, created_at, accessed_at
                 FROM cache_entries
                 WHERE plugin_name = ?1 AND cache_key = ?2",
                params![plugin_name, cache_key],
                map_cache_row,
            )
            .optional()?;

        Ok(entry)
    }

    /// Store a cache entry, replacing the response if the key already exists
    pub fn put_cache(
        &self,
        plugin_name: &str,
        cache_key: &str,
        request_data: &serde_json::Value,
        response_data: &serde_json::Value,
        user_id: &str,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO cache_entries
                (plugin_name, cache_key, request_data, response_data,
                 user_id, created_at, accessed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(plugin_name, cache_key) DO UPDATE SET
                response_data = excluded.response_data,
                accessed_at = excluded.accessed_at",
            params![
                plugin_name,
                cache_key,
                serde_json::to_string(request_data)?,
                serde_json::to_string(response_data)?,
                user_id,
                now
            ],
        )?;

        Ok(())
    }

    /// Refresh `accessed_at` without reading the entry
    ///
    /// Returns false when the key is not cached.
    pub fn touch_cache(&self, plugin_name: &str, cache_key: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let touched = conn.execute(
            "UPDATE cache_entries SET accessed_at = ?1
             WHERE plugin_name = ?2 AND cache_key = ?3",
            params![Utc::now().to_rfc3339(), plugin_name, cache_key],
        )?;
        Ok(touched > 0)
    }

    /// Delete a plugin's cache entries, optionally for one user only
    pub fn clear_plugin_cache(
        &self,
        plugin_name: &str,
        user_id: Option<&str>,
    ) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let deleted = match user_id {
            Some(user) => conn.execute(
                "DELETE FROM cache_entries WHERE plugin_name = ?1 AND user_id = ?2",
                params![plugin_name, user],
            )?,
            None => conn.execute(
                "DELETE FROM cache_entries WHERE plugin_name = ?1",
                params![plugin_name],
            )?,
        };
        Ok(deleted as u64)
    }

    /// Delete a plugin's cache entries strictly older than the cutoff
    ///
    /// Writes an audit row to `plugin_logs` and returns the deleted count.
    pub fn cleanup_old_cache(&self, plugin_name: &str, days_old: u32) -> StoreResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(days_old as i64);

        let deleted = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "DELETE FROM cache_entries WHERE plugin_name = ?1 AND created_at < ?2",
                params![plugin_name, cutoff.to_rfc3339()],
            )? as u64
        };

        self.log_event(
            LogLevel::Info,
            Some(plugin_name),
            &format!("Cache cleanup removed {} entries", deleted),
            Some(serde_json::json!({ "deleted": deleted, "days_old": days_old })),
        )?;

        log::info!(
            "Cache cleanup for '{}': {} entries older than {} days removed",
            plugin_name,
            deleted,
            days_old
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize(&StoreConfig::default()).unwrap();
        db
    }

    /// Insert an entry with a backdated created_at
    fn insert_aged(db: &Database, plugin: &str, key: &str, days_ago: i64) {
        let ts = (Utc::now() - chrono::Duration::days(days_ago)).to_rfc3339();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO cache_entries
                (plugin_name, cache_key, request_data, response_data,
                 user_id, created_at, accessed_at)
             VALUES (?1, ?2, '{}', '{}', 'u1', ?3, ?3)",
            params![plugin, key, ts],
        )
        .unwrap();
    }

    #[test]
    fn test_put_and_get_roundtrip() {
        let db = test_db();
        let request = json!({ "prompt": "hello" });
        let response = json!({ "text": "world" });

        db.put_cache("chatgpt", "key1", &request, &response, "u1")
            .unwrap();

        let entry = db.get_cache("chatgpt", "key1").unwrap().unwrap();
        assert_eq!(entry.request_data, request);
        assert_eq!(entry.response_data, response);
        assert_eq!(entry.user_id, "u1");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let db = test_db();
        assert!(db.get_cache("chatgpt", "absent").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_put_keeps_one_row() {
        let db = test_db();
        let request = json!({ "prompt": "hi" });

        db.put_cache("chatgpt", "key1", &request, &json!({ "v": 1 }), "u1")
            .unwrap();
        db.put_cache("chatgpt", "key1", &request, &json!({ "v": 2 }), "u1")
            .unwrap();

        let count: i64 = {
            let conn = db.conn.lock().unwrap();
            conn.query_row(
                "SELECT COUNT(*) FROM cache_entries WHERE plugin_name = 'chatgpt' AND cache_key = 'key1'",
                [],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(count, 1);

        let entry = db.get_cache("chatgpt", "key1").unwrap().unwrap();
        assert_eq!(entry.response_data, json!({ "v": 2 }));
    }

    #[test]
    fn test_same_key_different_plugins_are_separate() {
        let db = test_db();
        db.put_cache("chatgpt", "k", &json!({}), &json!({ "p": "chatgpt" }), "u1")
            .unwrap();
        db.put_cache("flux", "k", &json!({}), &json!({ "p": "flux" }), "u1")
            .unwrap();

        let chatgpt = db.get_cache("chatgpt", "k").unwrap().unwrap();
        let flux = db.get_cache("flux", "k").unwrap().unwrap();
        assert_eq!(chatgpt.response_data["p"], "chatgpt");
        assert_eq!(flux.response_data["p"], "flux");
    }

    #[test]
    fn test_get_refreshes_accessed_at() {
        let db = test_db();
        insert_aged(&db, "chatgpt", "old", 10);

        let entry = db.get_cache("chatgpt", "old").unwrap().unwrap();
        assert!(entry.accessed_at > entry.created_at);
    }

    #[test]
    fn test_touch_reports_presence() {
        let db = test_db();
        db.put_cache("chatgpt", "k", &json!({}), &json!({}), "u1")
            .unwrap();
        assert!(db.touch_cache("chatgpt", "k").unwrap());
        assert!(!db.touch_cache("chatgpt", "missing").unwrap());
    }

    #[test]
    fn test_clear_per_user_leaves_other_users() {
        let db = test_db();
        db.put_cache("chatgpt", "k1", &json!({}), &json!({}), "u1")
            .unwrap();
        db.put_cache("chatgpt", "k2", &json!({}), &json!({}), "u2")
            .unwrap();

        let deleted = db.clear_plugin_cache("chatgpt", Some("u1")).unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_cache("chatgpt", "k1").unwrap().is_none());
        assert!(db.get_cache("chatgpt", "k2").unwrap().is_some());
    }

    #[test]
    fn test_cleanup_deletes_only_strictly_older() {
        let db = test_db();
        insert_aged(&db, "chatgpt", "ancient", 40);
        insert_aged(&db, "chatgpt", "recent", 5);
        insert_aged(&db, "flux", "other_plugin", 40);

        let deleted = db.cleanup_old_cache("chatgpt", 30).unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_cache("chatgpt", "ancient").unwrap().is_none());
        assert!(db.get_cache("chatgpt", "recent").unwrap().is_some());
        // Other plugins untouched
        assert!(db.get_cache("flux", "other_plugin").unwrap().is_some());
    }

    #[test]
    fn test_cleanup_writes_audit_log() {
        let db = test_db();
        insert_aged(&db, "chatgpt", "ancient", 40);
        db.cleanup_old_cache("chatgpt", 30).unwrap();

        let logs = db.recent_logs(Some("chatgpt"), 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("Cache cleanup removed 1"));
    }
}
