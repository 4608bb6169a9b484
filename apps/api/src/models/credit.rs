use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::usage::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }
}

/// Per-user credit account. One row per user, created lazily, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub user_id: String,
    pub plan: Plan,
    pub daily_limit: i32,
    pub monthly_limit: i32,
    pub daily_used: i32,
    pub monthly_used: i32,
    pub last_reset_date: DateTime<Utc>,
    pub total_credits_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    /// Daily credits left. Negative for pro accounts that went past their
    /// (unenforced) daily limit.
    pub fn credits_remaining(&self) -> i32 {
        self.daily_limit - self.daily_used
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CreditAccountRow {
    pub user_id: String,
    pub plan: String,
    pub daily_limit: i32,
    pub monthly_limit: i32,
    pub daily_used: i32,
    pub monthly_used: i32,
    pub last_reset_date: DateTime<Utc>,
    pub total_credits_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CreditAccountRow> for CreditAccount {
    type Error = StoreError;

    fn try_from(row: CreditAccountRow) -> Result<Self, Self::Error> {
        let plan = Plan::parse(&row.plan).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown plan '{}' for user {}", row.plan, row.user_id))
        })?;
        Ok(CreditAccount {
            user_id: row.user_id,
            plan,
            daily_limit: row.daily_limit,
            monthly_limit: row.monthly_limit,
            daily_used: row.daily_used,
            monthly_used: row.monthly_used,
            last_reset_date: row.last_reset_date,
            total_credits_used: row.total_credits_used,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
