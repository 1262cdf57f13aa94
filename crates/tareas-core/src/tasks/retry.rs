use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retries after the first rate-limited call before giving up
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff when a 429 carries no `retry-after` header
const DEFAULT_RETRY_AFTER_MS: u64 = 5_000;

/// Minimum spacing between two task list fetches
const DEFAULT_MIN_FETCH_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub default_retry_after_ms: u64,
    pub min_fetch_interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            default_retry_after_ms: DEFAULT_RETRY_AFTER_MS,
            min_fetch_interval_ms: DEFAULT_MIN_FETCH_INTERVAL_MS,
        }
    }
}

impl RetryPolicy {
    pub fn default_retry_after(&self) -> Duration {
        Duration::from_millis(self.default_retry_after_ms)
    }

    pub fn min_fetch_interval(&self) -> Duration {
        Duration::from_millis(self.min_fetch_interval_ms)
    }
}

/// Attempt bookkeeping for one retry chain
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryState {
    /// Rate-limited attempts so far in the current chain
    pub attempts: u32,
}

impl RetryState {
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Whether another retry fits within `policy`
    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.attempts < policy.max_retries
    }
}

/// Whole seconds shown to the user for a backoff, rounded up
pub(crate) fn display_secs(delay: Duration) -> u64 {
    delay.as_secs() + u64::from(delay.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.default_retry_after(), Duration::from_secs(5));
        assert_eq!(policy.min_fetch_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_policy_partial_json_uses_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_retries": 5}"#).unwrap();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.default_retry_after_ms, 5_000);
    }

    #[test]
    fn test_can_retry_until_ceiling() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::default();
        for _ in 0..3 {
            assert!(state.can_retry(&policy));
            state.attempts += 1;
        }
        assert!(!state.can_retry(&policy));
        state.reset();
        assert_eq!(state.attempts, 0);
    }

    #[test]
    fn test_display_secs_rounds_up() {
        assert_eq!(display_secs(Duration::from_secs(5)), 5);
        assert_eq!(display_secs(Duration::from_millis(1_200)), 2);
        assert_eq!(display_secs(Duration::from_millis(50)), 1);
        assert_eq!(display_secs(Duration::ZERO), 0);
    }
}
