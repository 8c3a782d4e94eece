use rand::Rng;
use tokio::time::Duration;

use crate::config::RetryConfig;

/// Bounded exponential backoff with jitter, shared by every remote-call
/// site in the batch processor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay.max(config.base_delay),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the next try after `attempt` failures (1-based):
    /// base * 2^(attempt-1), capped at max_delay, plus up to 25% jitter to
    /// spread out competing callers.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base_ms = self.base_delay.as_millis() as u64;
        let cap_ms = self.max_delay.as_millis() as u64;

        let raw = base_ms.saturating_mul(1u64 << exponent).min(cap_ms);
        let jitter = rand::rng().random_range(0..=(raw / 4).max(1));

        Duration::from_millis(raw.saturating_add(jitter).min(cap_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
        })
    }

    #[test]
    fn delays_grow_exponentially() {
        let p = policy(100, 60_000);
        for _ in 0..20 {
            let first = p.delay_for(1).as_millis() as u64;
            let third = p.delay_for(3).as_millis() as u64;
            assert!((100..=125).contains(&first), "first delay {}", first);
            assert!((400..=500).contains(&third), "third delay {}", third);
        }
    }

    #[test]
    fn delays_never_exceed_the_cap() {
        let p = policy(100, 1_000);
        for attempt in 1..=32 {
            assert!(p.delay_for(attempt) <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn zero_attempts_config_is_clamped() {
        let p = RetryPolicy::new(&RetryConfig {
            max_attempts: 0,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        });
        assert_eq!(p.max_attempts(), 1);
    }
}
