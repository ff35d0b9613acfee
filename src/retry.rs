//! Bounded retry policy for transient page-fetch failures
//!
//! Acquisition retries the *same* page after a transient failure, up to a
//! configured number of consecutive failures. The counter resets on every
//! successful save, so the budget bounds uninterrupted failure streaks, not
//! total attempts across a document.

use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Consecutive-failure retry policy with reset-on-success
///
/// One instance tracks one document's acquisition. Record a failure with
/// [`RetryPolicy::record_failure`], which reports whether the budget is now
/// exhausted; call [`RetryPolicy::reset`] after each successful save.
#[derive(Debug)]
pub struct RetryPolicy {
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Create a policy from the retry configuration
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            consecutive_failures: 0,
            delay: config.retry_delay,
            jitter: config.jitter,
        }
    }

    /// Record one transient failure.
    ///
    /// Returns `true` when the failure streak now exceeds the budget and the
    /// document should be abandoned.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures > self.max_consecutive_failures
    }

    /// Reset the failure streak after a successful save
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Current length of the failure streak
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Sleep before retrying the same page.
    ///
    /// No-op when the configured delay is zero. With jitter enabled the
    /// actual delay is uniformly distributed between `delay` and `2 * delay`.
    pub async fn backoff(&self) {
        if self.delay.is_zero() {
            return;
        }
        let delay = if self.jitter {
            add_jitter(self.delay)
        } else {
            self.delay
        };
        tokio::time::sleep(delay).await;
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
