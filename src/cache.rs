//! Cache store facade
//!
//! Wraps the database cache table with key derivation and the global
//! cache gate. When caching is disabled every get misses and every put
//! is dropped, so callers never need to branch on the setting.

use crate::config::CacheSettings;
use crate::database::Database;
use crate::errors::StoreResult;
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct CacheStore {
    db: Database,
    settings: CacheSettings,
}

/// First few bytes of a key for log lines; keys are opaque caller
/// strings, so fall back to the whole key when byte 8 is not a char
/// boundary
fn key_prefix(cache_key: &str) -> &str {
    cache_key.get(..8).unwrap_or(cache_key)
}

impl CacheStore {
    pub fn new(db: Database, settings: CacheSettings) -> Self {
        Self { db, settings }
    }

    /// Derive the cache key for a request
    ///
    /// SHA-256 over the JSON of `{request, user_id}`. serde_json sorts
    /// object keys here, so logically equal requests hash identically.
    pub fn cache_key(request: &Value, user_id: &str) -> String {
        let canonical = serde_json::json!({
            "request": request,
            "user_id": user_id,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Look up a cached response
    pub fn get(&self, plugin_name: &str, cache_key: &str) -> StoreResult<Option<Value>> {
        if !self.settings.enabled {
            return Ok(None);
        }

        match self.db.get_cache(plugin_name, cache_key)? {
            Some(entry) => {
                log::info!(
                    "Cache hit for plugin '{}' with key '{}...'",
                    plugin_name,
                    key_prefix(cache_key)
                );
                Ok(Some(entry.response_data))
            }
            None => Ok(None),
        }
    }

    /// Store a response; no-op when caching is disabled
    pub fn put(
        &self,
        plugin_name: &str,
        cache_key: &str,
        request: &Value,
        response: &Value,
        user_id: &str,
    ) -> StoreResult<()> {
        if !self.settings.enabled {
            return Ok(());
        }

        self.db
            .put_cache(plugin_name, cache_key, request, response, user_id)?;
        log::debug!(
            "Cached response for plugin '{}' with key '{}...'",
            plugin_name,
            key_prefix(cache_key)
        );
        Ok(())
    }

    /// Refresh an entry's accessed_at
    pub fn touch(&self, plugin_name: &str, cache_key: &str) -> StoreResult<bool> {
        self.db.touch_cache(plugin_name, cache_key)
    }

    /// Drop a plugin's cache, optionally for one user
    pub fn clear(&self, plugin_name: &str, user_id: Option<&str>) -> StoreResult<u64> {
        let deleted = self.db.clear_plugin_cache(plugin_name, user_id)?;
        log::info!(
            "Cleared {} cache entries for plugin '{}'",
            deleted,
            plugin_name
        );
        Ok(deleted)
    }
}
