//! Storage seams consumed by the usage gate.
//!
//! Production: the Postgres implementations in `usage::postgres`.
//! Tests: the in-memory fakes in `usage::memory`.
//!
//! Every method is a short bounded read or write. Atomicity of a single
//! account's counters is the store's responsibility.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::PlanLimits;
use crate::models::cache::CacheEntryRow;
use crate::models::credit::CreditAccount;
use crate::models::usage::{UsageRecordRow, UsageSummary};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A live row already exists under the same unique key.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn find(&self, user_id: &str) -> StoreResult<Option<CreditAccount>>;

    /// Returns the existing account, or creates a free-plan account with the
    /// given limits. Creation must be idempotent under concurrent callers.
    async fn get_or_create(
        &self,
        user_id: &str,
        limits: PlanLimits,
        now: DateTime<Utc>,
    ) -> StoreResult<CreditAccount>;

    /// Zeroes `daily_used` and stamps `last_reset_date = at`, but only while
    /// `last_reset_date` still equals `seen_reset`. If another caller reset
    /// first, the current account is returned unchanged.
    async fn reset_daily(
        &self,
        user_id: &str,
        seen_reset: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<CreditAccount>;

    /// Zeroes `monthly_used`.
    async fn reset_monthly(&self, user_id: &str, at: DateTime<Utc>) -> StoreResult<CreditAccount>;

    /// Adds one credit to daily, monthly and lifetime counters in a single write.
    async fn increment(&self, user_id: &str, at: DateTime<Utc>) -> StoreResult<CreditAccount>;
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the stored entry regardless of expiry; callers check freshness.
    async fn get(&self, request_hash: &str) -> StoreResult<Option<CacheEntryRow>>;

    /// Inserts the entry, replacing an expired row under the same hash.
    /// Fails with `StoreError::Conflict` if a live row already exists.
    async fn put(&self, entry: &CacheEntryRow) -> StoreResult<()>;

    /// Inserts the entry, overwriting any row under the same hash, live or not.
    async fn replace(&self, entry: &CacheEntryRow) -> StoreResult<()>;

    /// Bumps `access_count` and `last_accessed_at`.
    async fn touch(&self, request_hash: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Physically removes expired rows. Housekeeping only.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: &UsageRecordRow) -> StoreResult<()>;

    async fn summary(&self, user_id: &str) -> StoreResult<UsageSummary>;
}
