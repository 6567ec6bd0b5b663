//! Reconnect backoff policy

use std::time::Duration;

/// Capped exponential backoff with a hard retry ceiling
///
/// The delay before retry `k` is `min(base_delay * 2^k, max_delay)`.
/// Once `k` reaches `max_retries` no further retry is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Automatic reconnects allowed before giving up
    pub max_retries: u32,
    /// Delay before the first reconnect
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `retry_count`, or `None` once the budget is spent
    pub fn delay_for(&self, retry_count: u32) -> Option<Duration> {
        if retry_count >= self.max_retries {
            return None;
        }

        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u128> = (0..5)
            .map(|k| policy.delay_for(k).unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000]);
    }

    #[test]
    fn test_budget_exhausted() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(5), None);
        assert_eq!(policy.delay_for(40), None);
    }

    #[test]
    fn test_matches_formula_for_custom_policy() {
        let policy = BackoffPolicy::new(
            12,
            Duration::from_millis(250),
            Duration::from_millis(30_000),
        );
        for k in 0..12 {
            let expected = (250u64 * 2u64.pow(k)).min(30_000);
            assert_eq!(policy.delay_for(k), Some(Duration::from_millis(expected)));
        }
    }

    #[test]
    fn test_large_exponent_saturates_to_cap() {
        let policy = BackoffPolicy::new(u32::MAX, Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(31), Some(Duration::from_secs(10)));
        assert_eq!(policy.delay_for(64), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_retries_never_schedules() {
        let policy = BackoffPolicy::new(0, Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(0), None);
    }
}
