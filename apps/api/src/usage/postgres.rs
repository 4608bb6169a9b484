//! Postgres-backed stores.
//!
//! Expected tables (created outside this service):
//!
//! ```text
//! ai_credits (user_id TEXT PRIMARY KEY, plan TEXT, daily_limit INT, monthly_limit INT,
//!             daily_used INT, monthly_used INT, last_reset_date TIMESTAMPTZ,
//!             total_credits_used BIGINT, created_at TIMESTAMPTZ, updated_at TIMESTAMPTZ)
//! ai_cache   (request_hash TEXT PRIMARY KEY, operation_type TEXT, input_data JSONB,
//!             output_data JSONB, expires_at TIMESTAMPTZ, access_count INT,
//!             last_accessed_at TIMESTAMPTZ, created_at TIMESTAMPTZ)
//! ai_usage   (id UUID PRIMARY KEY, user_id TEXT, operation_type TEXT, request_hash TEXT,
//!             status TEXT, tokens_used INT, cost_estimate DOUBLE PRECISION,
//!             error_message TEXT, created_at TIMESTAMPTZ)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::config::PlanLimits;
use crate::models::cache::CacheEntryRow;
use crate::models::credit::{CreditAccount, CreditAccountRow, Plan};
use crate::models::usage::{UsageRecordRow, UsageSummary};
use crate::usage::store::{AuditLog, CreditStore, ResultCache, StoreError, StoreResult};

#[derive(Clone)]
pub struct PgCreditStore {
    pool: PgPool,
}

impl PgCreditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditStore for PgCreditStore {
    async fn find(&self, user_id: &str) -> StoreResult<Option<CreditAccount>> {
        let row = sqlx::query_as::<_, CreditAccountRow>(
            "SELECT * FROM ai_credits WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CreditAccount::try_from).transpose()
    }

    async fn get_or_create(
        &self,
        user_id: &str,
        limits: PlanLimits,
        now: DateTime<Utc>,
    ) -> StoreResult<CreditAccount> {
        // Concurrent first requests race on the primary key; the loser's insert is a no-op.
        sqlx::query(
            r#"
            INSERT INTO ai_credits
                (user_id, plan, daily_limit, monthly_limit, daily_used, monthly_used,
                 last_reset_date, total_credits_used, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 0, 0, $5, 0, $5, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(Plan::Free.as_str())
        .bind(limits.daily)
        .bind(limits.monthly)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find(user_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn reset_daily(
        &self,
        user_id: &str,
        seen_reset: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<CreditAccount> {
        // Compare-and-set on last_reset_date: of two concurrent first-of-day
        // resets only one matches, so a debit between them survives.
        let row = sqlx::query_as::<_, CreditAccountRow>(
            r#"
            UPDATE ai_credits
            SET daily_used = 0, last_reset_date = $2, updated_at = $2
            WHERE user_id = $1 AND last_reset_date = $3
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(at)
        .bind(seen_reset)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => self
                .find(user_id)
                .await?
                .ok_or(StoreError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn reset_monthly(&self, user_id: &str, at: DateTime<Utc>) -> StoreResult<CreditAccount> {
        let row = sqlx::query_as::<_, CreditAccountRow>(
            r#"
            UPDATE ai_credits
            SET monthly_used = 0, updated_at = $2
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn increment(&self, user_id: &str, at: DateTime<Utc>) -> StoreResult<CreditAccount> {
        // Single-statement increment: the row lock serializes concurrent debits.
        let row = sqlx::query_as::<_, CreditAccountRow>(
            r#"
            UPDATE ai_credits
            SET daily_used = daily_used + 1,
                monthly_used = monthly_used + 1,
                total_credits_used = total_credits_used + 1,
                updated_at = $2
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }
}

#[derive(Clone)]
pub struct PgResultCache {
    pool: PgPool,
}

impl PgResultCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultCache for PgResultCache {
    async fn get(&self, request_hash: &str) -> StoreResult<Option<CacheEntryRow>> {
        Ok(sqlx::query_as::<_, CacheEntryRow>(
            "SELECT * FROM ai_cache WHERE request_hash = $1",
        )
        .bind(request_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn put(&self, entry: &CacheEntryRow) -> StoreResult<()> {
        // An expired row is overwritten in place; a live row is left alone and
        // reported as a conflict.
        let result = sqlx::query(
            r#"
            INSERT INTO ai_cache
                (request_hash, operation_type, input_data, output_data,
                 expires_at, access_count, last_accessed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (request_hash) DO UPDATE
            SET operation_type = EXCLUDED.operation_type,
                input_data = EXCLUDED.input_data,
                output_data = EXCLUDED.output_data,
                expires_at = EXCLUDED.expires_at,
                access_count = EXCLUDED.access_count,
                last_accessed_at = EXCLUDED.last_accessed_at,
                created_at = EXCLUDED.created_at
            WHERE ai_cache.expires_at <= EXCLUDED.created_at
            "#,
        )
        .bind(&entry.request_hash)
        .bind(&entry.operation_type)
        .bind(&entry.input_data)
        .bind(&entry.output_data)
        .bind(entry.expires_at)
        .bind(entry.access_count)
        .bind(entry.last_accessed_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "live cache entry {} already exists",
                entry.request_hash
            )));
        }
        Ok(())
    }

    async fn replace(&self, entry: &CacheEntryRow) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_cache
                (request_hash, operation_type, input_data, output_data,
                 expires_at, access_count, last_accessed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (request_hash) DO UPDATE
            SET operation_type = EXCLUDED.operation_type,
                input_data = EXCLUDED.input_data,
                output_data = EXCLUDED.output_data,
                expires_at = EXCLUDED.expires_at,
                access_count = EXCLUDED.access_count,
                last_accessed_at = EXCLUDED.last_accessed_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&entry.request_hash)
        .bind(&entry.operation_type)
        .bind(&entry.input_data)
        .bind(&entry.output_data)
        .bind(entry.expires_at)
        .bind(entry.access_count)
        .bind(entry.last_accessed_at)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch(&self, request_hash: &str, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE ai_cache
            SET access_count = access_count + 1, last_accessed_at = $2
            WHERE request_hash = $1
            "#,
        )
        .bind(request_hash)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM ai_cache WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, record: &UsageRecordRow) -> StoreResult<()> {
        // Append-only: usage rows are never updated.
        sqlx::query(
            r#"
            INSERT INTO ai_usage
                (id, user_id, operation_type, request_hash, status,
                 tokens_used, cost_estimate, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.operation_type)
        .bind(&record.request_hash)
        .bind(&record.status)
        .bind(record.tokens_used)
        .bind(record.cost_estimate)
        .bind(&record.error_message)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn summary(&self, user_id: &str) -> StoreResult<UsageSummary> {
        Ok(sqlx::query_as::<_, UsageSummary>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'cached')    AS cached,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed')    AS failed
            FROM ai_usage
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }
}
