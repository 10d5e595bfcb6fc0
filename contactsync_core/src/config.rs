use crate::{Error, Result};
use std::time::Duration;

/// Orchestrator-owned fetch retry policy. Only retryable source failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts per run, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before attempt `n` (1-based retry number) is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(retry)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Sync run tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound for one fetch attempt; the only unbounded external call in a run.
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    /// Page size for run-log listings when the caller gives no limit. `1..=MAX_RUNS_LIMIT`.
    pub runs_default_limit: usize,
}

/// Largest page a run-log listing may request.
pub const MAX_RUNS_LIMIT: usize = 500;

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            runs_default_limit: 25,
        }
    }
}

impl SyncConfig {
    /// Read overrides from `CONTACTSYNC_FETCH_TIMEOUT_MS`, `CONTACTSYNC_FETCH_MAX_ATTEMPTS`,
    /// `CONTACTSYNC_FETCH_RETRY_BACKOFF_MS` and `CONTACTSYNC_RUNS_DEFAULT_LIMIT`.
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(ms) = env_u64("CONTACTSYNC_FETCH_TIMEOUT_MS")? {
            if ms == 0 {
                return Err(Error::InvalidInput(
                    "CONTACTSYNC_FETCH_TIMEOUT_MS must be > 0".to_string(),
                ));
            }
            cfg.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("CONTACTSYNC_FETCH_MAX_ATTEMPTS")? {
            cfg.retry.max_attempts = u32::try_from(n).unwrap_or(u32::MAX).max(1);
        }
        if let Some(ms) = env_u64("CONTACTSYNC_FETCH_RETRY_BACKOFF_MS")? {
            cfg.retry.backoff = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("CONTACTSYNC_RUNS_DEFAULT_LIMIT")? {
            cfg.runs_default_limit = usize::try_from(n)
                .ok()
                .filter(|n| (1..=MAX_RUNS_LIMIT).contains(n))
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "CONTACTSYNC_RUNS_DEFAULT_LIMIT must be between 1 and {MAX_RUNS_LIMIT}"
                    ))
                })?;
        }
        Ok(cfg)
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("invalid {key}: {e}"))),
        _ => Ok(None),
    }
}
