//! UsageGate — the policy applied before and after every billable AI call.
//!
//! Flow for a handler:
//! 1. `evaluate` → `Blocked` (report quota exceeded), `Cached` (return the
//!    stored output, do not call the provider) or `Fresh` (call the provider).
//! 2. After a `Fresh` decision, exactly one of `commit` or `fail`.
//!
//! Ordering rule: the quota block is checked before the cache lookup, so a
//! free user with no credits left is blocked even when a cached result exists.
//!
//! Daily and monthly counters are reset lazily on the first evaluation in a
//! new period. There is no scheduler.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GatePolicy;
use crate::models::cache::CacheEntryRow;
use crate::models::credit::{CreditAccount, Plan};
use crate::models::usage::{UsageRecordRow, UsageStatus};
use crate::usage::clock::Clock;
use crate::usage::fingerprint::fingerprint_input;
use crate::usage::operation::{OperationInput, OperationType};
use crate::usage::store::{AuditLog, CreditStore, ResultCache, StoreError, StoreResult};

/// Credits reported to unlimited principals.
pub const UNLIMITED_CREDITS: i32 = 999_999;

/// Outcome of `UsageGate::evaluate`.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Free plan, no daily credits left. The provider must not be called.
    Blocked { daily_limit: i32 },
    /// A fresh stored result exists. Final; no credit was debited.
    Cached {
        output: Value,
        credits_remaining: i32,
    },
    /// Caller must invoke the provider, then `commit` or `fail`.
    /// `credits_remaining` already reflects the pending charge.
    Fresh {
        request_hash: String,
        credits_remaining: i32,
    },
}

/// Parameters for finalizing a fresh computation.
pub struct CommitParams<'a> {
    pub user_id: &'a str,
    pub operation: OperationType,
    pub request_hash: &'a str,
    pub input_data: Option<&'a Value>,
    pub output: &'a Value,
    pub tokens_used: i32,
    /// The evaluation skipped the cache; the new output replaces any live entry.
    pub force_refresh: bool,
}

/// Consumption snapshot for display ("3 of 5 used today").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub plan: Plan,
    pub daily_used: i32,
    pub daily_limit: i32,
    pub monthly_used: i32,
    pub monthly_limit: i32,
    pub total_used: i64,
    pub cache_hit_rate: f64,
}

pub struct UsageGate {
    credits: Arc<dyn CreditStore>,
    cache: Arc<dyn ResultCache>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    policy: GatePolicy,
}

impl UsageGate {
    pub fn new(
        credits: Arc<dyn CreditStore>,
        cache: Arc<dyn ResultCache>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            credits,
            cache,
            audit,
            clock,
            policy,
        }
    }

    pub fn is_unlimited(&self, user_id: &str) -> bool {
        self.policy.unlimited_user_ids.contains(user_id)
    }

    /// Decides whether `user_id` may run `input`, and whether from cache.
    pub async fn evaluate(
        &self,
        user_id: &str,
        input: &OperationInput,
        force_refresh: bool,
    ) -> StoreResult<GateDecision> {
        let request_hash = fingerprint_input(input);
        let operation = input.operation_type();

        if self.is_unlimited(user_id) {
            debug!("Unlimited principal {user_id}: fresh {operation} without quota checks");
            return Ok(GateDecision::Fresh {
                request_hash,
                credits_remaining: UNLIMITED_CREDITS,
            });
        }

        let account = self.load_account(user_id).await?;
        let credits_remaining = account.credits_remaining();

        if credits_remaining <= 0 && account.plan == Plan::Free {
            info!(
                "User {user_id} blocked for {operation}: {}/{} daily credits used",
                account.daily_used, account.daily_limit
            );
            return Ok(GateDecision::Blocked {
                daily_limit: account.daily_limit,
            });
        }

        if !force_refresh {
            if let Some(entry) = self.cache.get(&request_hash).await? {
                let now = self.clock.now();
                if entry.is_fresh(now) {
                    self.cache.touch(&request_hash, now).await?;
                    self.audit
                        .append(&self.usage_record(
                            user_id,
                            operation,
                            &request_hash,
                            UsageStatus::Cached,
                            0,
                            None,
                        ))
                        .await?;
                    debug!("Cache hit for {operation} ({request_hash}) by user {user_id}");
                    return Ok(GateDecision::Cached {
                        output: entry.output_data,
                        credits_remaining: credits_remaining.max(0),
                    });
                }
                debug!("Ignoring expired cache entry {request_hash}");
            }
        }

        Ok(GateDecision::Fresh {
            request_hash,
            credits_remaining: (credits_remaining - 1).max(0),
        })
    }

    /// Finalizes a fresh computation: debit one credit, record the usage and
    /// store the output for later identical requests.
    ///
    /// The debit is authoritative and propagates store errors. The cache write
    /// is best-effort: losing a race to a concurrent writer, or any other
    /// cache failure, is logged and does not fail the commit. A forced
    /// refresh overwrites the live entry it bypassed.
    pub async fn commit(&self, params: CommitParams<'_>) -> StoreResult<()> {
        let CommitParams {
            user_id,
            operation,
            request_hash,
            input_data,
            output,
            tokens_used,
            force_refresh,
        } = params;
        let now = self.clock.now();

        if self.is_unlimited(user_id) {
            debug!("Unlimited principal {user_id}: commit without debit");
        } else {
            let account = self.credits.increment(user_id, now).await?;
            info!(
                "Debited 1 credit from {user_id} for {operation}: {}/{} used today",
                account.daily_used, account.daily_limit
            );
        }

        self.audit
            .append(&self.usage_record(
                user_id,
                operation,
                request_hash,
                UsageStatus::Completed,
                tokens_used,
                None,
            ))
            .await?;

        let entry = CacheEntryRow {
            request_hash: request_hash.to_string(),
            operation_type: operation.as_str().to_string(),
            input_data: input_data.cloned(),
            output_data: output.clone(),
            expires_at: now + Duration::hours(self.policy.cache_ttl_hours),
            access_count: 1,
            last_accessed_at: now,
            created_at: now,
        };
        let written = if force_refresh {
            self.cache.replace(&entry).await
        } else {
            self.cache.put(&entry).await
        };
        match written {
            Ok(()) => debug!("Cached {operation} result {request_hash}"),
            Err(StoreError::Conflict(msg)) => {
                debug!("Cache write for {request_hash} lost to a concurrent writer: {msg}")
            }
            Err(e) => warn!("Cache write for {request_hash} failed, result not cached: {e}"),
        }

        Ok(())
    }

    /// Records a failed provider call. No debit, no cache write.
    pub async fn fail(
        &self,
        user_id: &str,
        operation: OperationType,
        request_hash: &str,
        error_message: &str,
    ) -> StoreResult<()> {
        warn!("{operation} failed for user {user_id} ({request_hash}): {error_message}");
        self.audit
            .append(&self.usage_record(
                user_id,
                operation,
                request_hash,
                UsageStatus::Failed,
                0,
                Some(error_message),
            ))
            .await
    }

    /// Read-only view of a user's consumption. Users without an account get
    /// the free-plan defaults with zero usage. A stale daily counter (last
    /// reset on an earlier day) is reported as 0 without being written.
    pub async fn usage_stats(&self, user_id: &str) -> StoreResult<UsageStats> {
        let summary = self.audit.summary(user_id).await?;
        let cache_hit_rate = summary.cache_hit_rate();

        let Some(account) = self.credits.find(user_id).await? else {
            let limits = self.policy.free_limits;
            return Ok(UsageStats {
                plan: Plan::Free,
                daily_used: 0,
                daily_limit: limits.daily,
                monthly_used: 0,
                monthly_limit: limits.monthly,
                total_used: 0,
                cache_hit_rate,
            });
        };

        let today = self.clock.today();
        let last_reset = self.clock.date_of(account.last_reset_date);
        let daily_used = if last_reset == today {
            account.daily_used
        } else {
            0
        };
        let monthly_used = if same_month(last_reset, today) {
            account.monthly_used
        } else {
            0
        };

        Ok(UsageStats {
            plan: account.plan,
            daily_used,
            daily_limit: account.daily_limit,
            monthly_used,
            monthly_limit: account.monthly_limit,
            total_used: account.total_credits_used,
            cache_hit_rate,
        })
    }

    /// Deletes expired cache rows. Expired rows are already ignored on read,
    /// so this only reclaims space.
    pub async fn purge_expired_cache(&self) -> StoreResult<u64> {
        let removed = self.cache.purge_expired(self.clock.now()).await?;
        info!("Purged {removed} expired cache entries");
        Ok(removed)
    }

    /// Loads or creates the account and applies any pending period resets.
    async fn load_account(&self, user_id: &str) -> StoreResult<CreditAccount> {
        let now = self.clock.now();
        let mut account = self
            .credits
            .get_or_create(user_id, self.policy.free_limits, now)
            .await?;

        let today = self.clock.date_of(now);
        let last_reset = self.clock.date_of(account.last_reset_date);

        if !same_month(last_reset, today) {
            account = self.credits.reset_monthly(user_id, now).await?;
            info!("Monthly counter reset for {user_id}");
        }
        if last_reset != today {
            account = self
                .credits
                .reset_daily(user_id, account.last_reset_date, now)
                .await?;
            info!("Daily counter reset for {user_id} (last reset {last_reset})");
        }

        Ok(account)
    }

    fn usage_record(
        &self,
        user_id: &str,
        operation: OperationType,
        request_hash: &str,
        status: UsageStatus,
        tokens_used: i32,
        error_message: Option<&str>,
    ) -> UsageRecordRow {
        UsageRecordRow {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            operation_type: operation.as_str().to_string(),
            request_hash: request_hash.to_string(),
            status: status.as_str().to_string(),
            tokens_used,
            cost_estimate: estimate_cost(tokens_used, self.policy.cost_per_1k_tokens),
            error_message: error_message.map(str::to_string),
            created_at: self.clock.now(),
        }
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Linear cost model: USD per 1000 tokens.
pub fn estimate_cost(tokens_used: i32, cost_per_1k_tokens: f64) -> f64 {
    f64::from(tokens_used.max(0)) / 1000.0 * cost_per_1k_tokens
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
