//! Capped exponential backoff
//!
//! Delays start at the initial interval and grow by the multiplier after
//! every retry until they reach the maximum interval, where they stay. There
//! is no jitter, so the sequence never decreases.
//!
//! Attempt and elapsed-time limits are both optional. With neither set the
//! schedule never runs out and callers retry forever.

use crate::config::FetcherConfig;
use std::time::{Duration, Instant};

/// Immutable retry parameters, shared by every fetch
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_elapsed: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            initial_interval: config.initial_interval(),
            multiplier: config.multiplier,
            max_interval: config.max_interval(),
            max_attempts: config.max_attempts,
            max_elapsed: config.max_elapsed(),
        }
    }

    /// Starts a fresh schedule for one fetch
    pub fn schedule(&self) -> Backoff {
        Backoff {
            current: self.initial_interval.min(self.max_interval),
            policy: self.clone(),
            attempts: 0,
            started: Instant::now(),
        }
    }
}

/// Per-fetch retry state
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
    attempts: u32,
    started: Instant,
}

impl Backoff {
    /// Records a failed attempt and returns how long to wait before the next
    ///
    /// Returns `None` once a configured attempt or elapsed-time limit is hit.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;

        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                return None;
            }
        }

        if let Some(max) = self.policy.max_elapsed {
            if self.started.elapsed() >= max {
                return None;
            }
        }

        let delay = self.current;
        let grown = Duration::try_from_secs_f64(delay.as_secs_f64() * self.policy.multiplier)
            .unwrap_or(self.policy.max_interval);
        self.current = grown.min(self.policy.max_interval);
        Some(delay)
    }

    /// Number of failed attempts recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: Option<u32>) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(2),
            max_attempts,
            max_elapsed: None,
        }
    }

    #[test]
    fn test_delays_grow_then_cap() {
        let mut backoff = policy(None).schedule();
        let delays: Vec<Duration> = (0..8).map(|_| backoff.next_delay().unwrap()).collect();

        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_millis(750));
        assert_eq!(delays[2], Duration::from_millis(1125));
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0], "delays must not decrease: {:?}", delays);
        }
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(2)));
        assert_eq!(delays[7], Duration::from_secs(2));
    }

    #[test]
    fn test_unbounded_schedule_never_stops() {
        let mut backoff = policy(None).schedule();
        for _ in 0..1_000 {
            assert!(backoff.next_delay().is_some());
        }
        assert_eq!(backoff.attempts(), 1_000);
    }

    #[test]
    fn test_max_attempts() {
        let mut backoff = policy(Some(3)).schedule();
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_max_elapsed() {
        let mut policy = policy(None);
        policy.max_elapsed = Some(Duration::ZERO);
        let mut backoff = policy.schedule();
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_initial_above_cap_is_clamped() {
        let mut policy = policy(None);
        policy.initial_interval = Duration::from_secs(10);
        let mut backoff = policy.schedule();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_millis(500));
        assert_eq!(policy.max_interval, Duration::from_secs(300));
        assert_eq!(policy.max_attempts, None);
    }
}
