//! In-memory store fakes for tests. Same contracts as the Postgres stores,
//! plus switches that make a store fail the way an unreachable database does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::PlanLimits;
use crate::models::cache::CacheEntryRow;
use crate::models::credit::{CreditAccount, Plan};
use crate::models::usage::{UsageRecordRow, UsageStatus, UsageSummary};
use crate::usage::store::{AuditLog, CreditStore, ResultCache, StoreError, StoreResult};

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct MemoryCreditStore {
    accounts: Mutex<HashMap<String, CreditAccount>>,
    down: AtomicBool,
}

impl MemoryCreditStore {
    /// While set, every operation fails with a database error.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check_up(&self) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    /// Seeds or replaces an account directly, bypassing lazy creation.
    pub fn insert(&self, account: CreditAccount) {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.user_id.clone(), account);
    }

    pub fn get(&self, user_id: &str) -> Option<CreditAccount> {
        self.accounts.lock().unwrap().get(user_id).cloned()
    }

    fn update<F>(&self, user_id: &str, at: DateTime<Utc>, f: F) -> StoreResult<CreditAccount>
    where
        F: FnOnce(&mut CreditAccount),
    {
        self.check_up()?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| StoreError::Database(sqlx::Error::RowNotFound))?;
        f(account);
        account.updated_at = at;
        Ok(account.clone())
    }
}

#[async_trait]
impl CreditStore for MemoryCreditStore {
    async fn find(&self, user_id: &str) -> StoreResult<Option<CreditAccount>> {
        self.check_up()?;
        Ok(self.get(user_id))
    }

    async fn get_or_create(
        &self,
        user_id: &str,
        limits: PlanLimits,
        now: DateTime<Utc>,
    ) -> StoreResult<CreditAccount> {
        self.check_up()?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .entry(user_id.to_string())
            .or_insert_with(|| CreditAccount {
                user_id: user_id.to_string(),
                plan: Plan::Free,
                daily_limit: limits.daily,
                monthly_limit: limits.monthly,
                daily_used: 0,
                monthly_used: 0,
                last_reset_date: now,
                total_credits_used: 0,
                created_at: now,
                updated_at: now,
            });
        Ok(account.clone())
    }

    async fn reset_daily(
        &self,
        user_id: &str,
        seen_reset: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> StoreResult<CreditAccount> {
        let current = self
            .find(user_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        if current.last_reset_date != seen_reset {
            return Ok(current);
        }
        self.update(user_id, at, |a| {
            a.daily_used = 0;
            a.last_reset_date = at;
        })
    }

    async fn reset_monthly(&self, user_id: &str, at: DateTime<Utc>) -> StoreResult<CreditAccount> {
        self.update(user_id, at, |a| a.monthly_used = 0)
    }

    async fn increment(&self, user_id: &str, at: DateTime<Utc>) -> StoreResult<CreditAccount> {
        self.update(user_id, at, |a| {
            a.daily_used += 1;
            a.monthly_used += 1;
            a.total_credits_used += 1;
        })
    }
}

#[derive(Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<String, CacheEntryRow>>,
    writes_fail: AtomicBool,
}

impl MemoryResultCache {
    /// While set, `put` and `replace` fail with a database error. Reads work.
    pub fn set_writes_fail(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    pub fn entry(&self, request_hash: &str) -> Option<CacheEntryRow> {
        self.entries.lock().unwrap().get(request_hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, request_hash: &str) -> StoreResult<Option<CacheEntryRow>> {
        Ok(self.entry(request_hash))
    }

    async fn put(&self, entry: &CacheEntryRow) -> StoreResult<()> {
        self.check_writable()?;
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&entry.request_hash) {
            if existing.is_fresh(entry.created_at) {
                return Err(StoreError::Conflict(format!(
                    "cache entry {} already exists",
                    entry.request_hash
                )));
            }
        }
        entries.insert(entry.request_hash.clone(), entry.clone());
        Ok(())
    }

    async fn replace(&self, entry: &CacheEntryRow) -> StoreResult<()> {
        self.check_writable()?;
        self.entries
            .lock()
            .unwrap()
            .insert(entry.request_hash.clone(), entry.clone());
        Ok(())
    }

    async fn touch(&self, request_hash: &str, at: DateTime<Utc>) -> StoreResult<()> {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(request_hash) {
            entry.access_count += 1;
            entry.last_accessed_at = at;
        }
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh(now));
        Ok((before - entries.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<UsageRecordRow>>,
}

impl MemoryAuditLog {
    pub fn records(&self) -> Vec<UsageRecordRow> {
        self.records.lock().unwrap().clone()
    }

    pub fn count(&self, status: UsageStatus) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == status.as_str())
            .count()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: &UsageRecordRow) -> StoreResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn summary(&self, user_id: &str) -> StoreResult<UsageSummary> {
        let records = self.records.lock().unwrap();
        let mut summary = UsageSummary::default();
        for record in records.iter().filter(|r| r.user_id == user_id) {
            match record.status.as_str() {
                "cached" => summary.cached += 1,
                "completed" => summary.completed += 1,
                "failed" => summary.failed += 1,
                _ => {}
            }
        }
        Ok(summary)
    }
}
