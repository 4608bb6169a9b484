use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A stored AI result, keyed by request fingerprint.
/// Shared across users: the key covers operation and input, never the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CacheEntryRow {
    pub request_hash: String,
    pub operation_type: String,
    pub input_data: Option<Value>,
    pub output_data: Value,
    pub expires_at: DateTime<Utc>,
    pub access_count: i32,
    pub last_accessed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntryRow {
    /// Expired entries are treated as absent even while still stored.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
