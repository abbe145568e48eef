// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry and backoff policy shared by the delivery pipeline and the queue
//! processor.

use std::time::Duration;

use courier_config::model::WorkerConfig;

/// Timing and ceiling parameters for delivery retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Ceiling for both the inline ladder and queued job attempts.
    pub max_retries: u32,
    /// First inline backoff; doubles after every bounded failure.
    pub initial_backoff: Duration,
    /// Wait used when a rate limit does not say how long.
    pub rate_limit_default_wait: Duration,
    /// Pause before requeueing a job whose session is not live.
    pub requeue_pause: Duration,
    /// Queue backoff is `queue_backoff_base * 2^attempts`.
    pub queue_backoff_base: Duration,
    /// Pause after an unexpected processor failure.
    pub processor_error_pause: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            rate_limit_default_wait: config.rate_limit_default_wait(),
            requeue_pause: config.requeue_pause(),
            queue_backoff_base: config.queue_backoff_base(),
            processor_error_pause: config.processor_error_pause(),
        }
    }

    /// How long to honour a rate limit.
    pub fn rate_limit_wait(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.rate_limit_default_wait)
    }

    /// Queue backoff for a failed job that had `attempts` prior attempts.
    pub fn queue_backoff(&self, attempts: u32) -> Duration {
        let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
        self.queue_backoff_base
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
    }

    /// Whether a job with `attempts` has used up its budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_retries
    }

    /// A fresh inline backoff ladder.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

/// Doubling backoff sequence starting at the initial delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self { next: initial }
    }

    /// Returns the current delay and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = current.checked_mul(2).unwrap_or(Duration::MAX);
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_follow_worker_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.rate_limit_default_wait, Duration::from_secs(30));
        assert_eq!(policy.requeue_pause, Duration::from_secs(5));
        assert_eq!(policy.processor_error_pause, Duration::from_secs(2));
    }

    #[test]
    fn backoff_doubles_from_initial() {
        let mut backoff = RetryPolicy::default().backoff();
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn queue_backoff_is_power_of_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.queue_backoff(0), Duration::from_secs(1));
        assert_eq!(policy.queue_backoff(1), Duration::from_secs(2));
        assert_eq!(policy.queue_backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn rate_limit_wait_defaults_when_unspecified() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_wait(None), Duration::from_secs(30));
        assert_eq!(
            policy.rate_limit_wait(Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn exhaustion_is_at_the_ceiling() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let mut backoff = Backoff::new(Duration::MAX / 2 + Duration::from_secs(1));
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }

    proptest! {
        #[test]
        fn successive_delays_at_least_double(initial_ms in 1u64..10_000, steps in 1usize..20) {
            let mut backoff = Backoff::new(Duration::from_millis(initial_ms));
            let mut previous = backoff.next_delay();
            prop_assert_eq!(previous, Duration::from_millis(initial_ms));
            for _ in 0..steps {
                let next = backoff.next_delay();
                prop_assert!(next >= previous * 2 || next == Duration::MAX);
                previous = next;
            }
        }

        #[test]
        fn queue_backoff_is_monotonic(attempts in 0u32..40) {
            let policy = RetryPolicy::default();
            prop_assert!(policy.queue_backoff(attempts + 1) >= policy.queue_backoff(attempts));
        }
    }
}
