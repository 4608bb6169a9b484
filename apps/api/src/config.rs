use std::collections::HashSet;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub gate: GatePolicy,
}

/// Quota and cache policy handed to the `UsageGate`.
#[derive(Debug, Clone, PartialEq)]
pub struct GatePolicy {
    /// Principals that are never blocked and never debited.
    pub unlimited_user_ids: HashSet<String>,
    /// Limits given to lazily created (free) accounts.
    pub free_limits: PlanLimits,
    pub cache_ttl_hours: i64,
    /// Estimated USD per 1000 tokens, used for usage-record cost bookkeeping.
    pub cost_per_1k_tokens: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub daily: i32,
    pub monthly: i32,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            unlimited_user_ids: HashSet::new(),
            free_limits: PlanLimits {
                daily: 5,
                monthly: 100,
            },
            cache_ttl_hours: 24,
            cost_per_1k_tokens: 0.002,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = GatePolicy::default();
        let gate = GatePolicy {
            unlimited_user_ids: parse_id_list(
                &std::env::var("UNLIMITED_USER_IDS").unwrap_or_default(),
            ),
            free_limits: PlanLimits {
                daily: optional_env("FREE_DAILY_LIMIT", defaults.free_limits.daily)?,
                monthly: optional_env("FREE_MONTHLY_LIMIT", defaults.free_limits.monthly)?,
            },
            cache_ttl_hours: optional_env("CACHE_TTL_HOURS", defaults.cache_ttl_hours)?,
            cost_per_1k_tokens: optional_env("COST_PER_1K_TOKENS", defaults.cost_per_1k_tokens)?,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gate,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated list of user ids, dropping blanks.
fn parse_id_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list_trims_and_skips_blanks() {
        let ids = parse_id_list(" 40032470 , ,ops-admin,");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("40032470"));
        assert!(ids.contains("ops-admin"));
    }

    #[test]
    fn test_parse_id_list_empty() {
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_default_policy_matches_free_plan() {
        let policy = GatePolicy::default();
        assert_eq!(policy.free_limits.daily, 5);
        assert_eq!(policy.cache_ttl_hours, 24);
        assert!(policy.unlimited_user_ids.is_empty());
    }
}
