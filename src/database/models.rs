use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parse an RFC 3339 timestamp column into UTC
pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a JSON TEXT column
pub(crate) fn parse_json(idx: usize, raw: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Memoized request/response pair for one plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub plugin_name: String,
    pub cache_key: String,
    pub request_data: Value,
    pub response_data: Value,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
}

/// One row per processed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub plugin_name: String,
    pub endpoint: String,
    pub user_id: String,
    pub processing_time_ms: f64,
    pub cache_hit: bool,
    pub tokens_used: Option<i64>,
    pub response_bytes: Option<i64>,
    pub success: bool,
    pub error_type: Option<String>,
    pub metadata: Option<Value>,
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceRecord {
    /// New successful record stamped with the current time
    pub fn new(plugin_name: &str, endpoint: &str, user_id: &str, processing_time_ms: f64) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            endpoint: endpoint.to_string(),
            user_id: user_id.to_string(),
            processing_time_ms,
            cache_hit: false,
            tokens_used: None,
            response_bytes: None,
            success: true,
            error_type: None,
            metadata: None,
            recorded_at: Utc::now(),
        }
    }
}

/// Log severity stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "debug" => LogLevel::Debug,
            "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub plugin_name: Option<String>,
    pub user_id: Option<String>,
    pub message: String,
    pub metadata: Option<Value>,
    pub request_id: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: &str) -> Self {
        Self {
            level,
            plugin_name: None,
            user_id: None,
            message: message.to_string(),
            metadata: None,
            request_id: None,
            logged_at: Utc::now(),
        }
    }
}

/// Configuration row for one plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub plugin_name: String,
    pub enabled: bool,
    pub config: Value,
    pub rate_limit_per_minute: i64,
    pub cache_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated request metrics for one plugin over a time window
///
/// Rates are filtered-count ratios rounded to two decimals; `None` when
/// the window holds no requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetrics {
    pub total_requests: i64,
    pub cache_hit_rate: Option<f64>,
    pub avg_processing_time_ms: Option<f64>,
    pub error_rate: Option<f64>,
    pub unique_users: i64,
}

/// Per-plugin cache summary (monitoring view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub plugin_name: String,
    pub entry_count: i64,
    pub unique_users: i64,
    pub avg_age_secs: Option<f64>,
    pub last_accessed: Option<DateTime<Utc>>,
}
