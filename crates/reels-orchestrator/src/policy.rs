//! Polling and retry policy.

use std::time::Duration;

/// Bounds on provider polling and transient retries.
///
/// Polling is fixed-interval with a hard attempt cap; exceeding the cap marks
/// the job failed with a poll-timeout error. The provider-side work is not
/// cancelled (no provider we integrate exposes cancellation), which the
/// failure message states explicitly.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between consecutive polls of one job
    pub poll_interval: Duration,
    /// Maximum number of polls before giving up
    pub max_poll_attempts: u32,
    /// Retries of a single transient submit/poll call
    pub transient_retries: u32,
    /// Base delay for transient retry backoff
    pub retry_base_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_poll_attempts: 40,
            transient_retries: 2,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

impl PollPolicy {
    /// Create policy from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.poll_interval.as_millis() as u64),
            ),
            max_poll_attempts: std::env::var("POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_poll_attempts),
            transient_retries: std::env::var("POLL_TRANSIENT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.transient_retries),
            retry_base_delay: defaults.retry_base_delay,
        }
    }
}
