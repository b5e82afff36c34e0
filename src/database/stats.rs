//! Per-plugin cache statistics (monitoring view)

use crate::database::models::{parse_ts, CacheStatistics};
use crate::database::Database;
use crate::errors::StoreResult;

impl Database {
    /// Summarize the cache table per plugin: entry count, distinct users,
    /// average entry age in seconds, and most recent access
    pub fn cache_statistics(&self) -> StoreResult<Vec<CacheStatistics>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT plugin_name,
                    COUNT(*),
                    COUNT(DISTINCT user_id),
                    AVG((julianday('now') - julianday(created_at)) * 86400.0),
                    MAX(accessed_at)
             FROM cache_entries
             GROUP BY plugin_name
             ORDER BY plugin_name",
        )?;

        let rows = stmt.query_map([], |row| {
            let last_accessed = match row.get::<_, Option<String>>(4)? {
                Some(raw) => Some(parse_ts(4, &raw)?),
                None => None,
            };
            Ok(CacheStatistics {
                plugin_name: row.get(0)?,
                entry_count: row.get(1)?,
                unique_users: row.get(2)?,
                avg_age_secs: row.get(3)?,
                last_accessed,
            })
        })?;

        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
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

    #[test]
    fn test_empty_cache_has_no_rows() {
        let db = test_db();
        assert!(db.cache_statistics().unwrap().is_empty());
    }

    #[test]
    fn test_per_plugin_summary() {
        let db = test_db();
        db.put_cache("chatgpt", "k1", &json!({}), &json!({}), "u1")
            .unwrap();
        db.put_cache("chatgpt", "k2", &json!({}), &json!({}), "u1")
            .unwrap();
        db.put_cache("chatgpt", "k3", &json!({}), &json!({}), "u2")
            .unwrap();
        db.put_cache("flux", "k1", &json!({}), &json!({}), "u3")
            .unwrap();

        let stats = db.cache_statistics().unwrap();
        assert_eq!(stats.len(), 2);

        let chatgpt = &stats[0];
        assert_eq!(chatgpt.plugin_name, "chatgpt");
        assert_eq!(chatgpt.entry_count, 3);
        assert_eq!(chatgpt.unique_users, 2);
        assert!(chatgpt.avg_age_secs.is_some());
        assert!(chatgpt.last_accessed.is_some());

        let flux = &stats[1];
        assert_eq!(flux.entry_count, 1);
        assert_eq!(flux.unique_users, 1);
    }
}
