use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStatus {
    Cached,
    Completed,
    Failed,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Cached => "cached",
            UsageStatus::Completed => "completed",
            UsageStatus::Failed => "failed",
        }
    }
}

/// Append-only audit row. Never updated once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageRecordRow {
    pub id: Uuid,
    pub user_id: String,
    pub operation_type: String,
    pub request_hash: String,
    pub status: String,
    pub tokens_used: i32,
    pub cost_estimate: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user tallies over the audit log, by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct UsageSummary {
    pub cached: i64,
    pub completed: i64,
    pub failed: i64,
}

impl UsageSummary {
    /// Share of served results that came from cache. Failures are not served
    /// and do not count.
    pub fn cache_hit_rate(&self) -> f64 {
        let served = self.cached + self.completed;
        if served == 0 {
            0.0
        } else {
            self.cached as f64 / served as f64
        }
    }
}
