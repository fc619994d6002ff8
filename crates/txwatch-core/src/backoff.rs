//! Exponential backoff with jitter and a total elapsed-time budget.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Configuration for the retry backoff applied within a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first retry (milliseconds).
    pub initial_interval_ms: u64,
    /// Multiplier applied to the interval after each retry.
    pub multiplier: f64,
    /// Randomize each delay by ±`randomization_factor * interval` (0.0 = no jitter).
    pub randomization_factor: f64,
    /// Upper bound for a single delay (milliseconds).
    pub max_interval_ms: u64,
    /// Total time budget for retries, measured from the first failure (milliseconds).
    pub max_elapsed_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 250,
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval_ms: 30_000,
            max_elapsed_ms: 60_000,
        }
    }
}

/// Stateful backoff for one retry sequence. Create a fresh one per tick.
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    current_interval: Duration,
    started: Instant,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_interval: Duration::from_millis(config.initial_interval_ms),
            started: Instant::now(),
            attempts: 0,
            config,
        }
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time spent since this backoff sequence started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns the delay before the next retry, or `None` once the budget
    /// would be exceeded by waiting.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let max = Duration::from_millis(self.config.max_interval_ms);
        let delay = self.randomized(self.current_interval).min(max);
        let budget = Duration::from_millis(self.config.max_elapsed_ms);
        if self.elapsed() + delay > budget {
            return None;
        }

        self.current_interval = self
            .current_interval
            .mul_f64(self.config.multiplier.max(1.0))
            .min(max);
        self.attempts += 1;
        Some(delay)
    }

    fn randomized(&self, interval: Duration) -> Duration {
        let factor = self.config.randomization_factor.clamp(0.0, 1.0);
        if factor == 0.0 {
            return interval;
        }
        let delta = interval.as_secs_f64() * factor;
        let low = interval.as_secs_f64() - delta;
        let high = interval.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> BackoffConfig {
        BackoffConfig {
            randomization_factor: 0.0,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delays_grow_geometrically() {
        let mut b = ExponentialBackoff::new(BackoffConfig {
            multiplier: 2.0,
            ..no_jitter()
        });
        assert_eq!(b.next_backoff(), Some(Duration::from_millis(250)));
        assert_eq!(b.next_backoff(), Some(Duration::from_millis(500)));
        assert_eq!(b.next_backoff(), Some(Duration::from_millis(1000)));
        assert_eq!(b.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_capped_at_max_interval() {
        let mut b = ExponentialBackoff::new(BackoffConfig {
            initial_interval_ms: 100,
            multiplier: 10.0,
            max_interval_ms: 500,
            ..no_jitter()
        });
        for _ in 0..5 {
            let d = b.next_backoff().unwrap();
            assert!(d <= Duration::from_millis(500), "d={d:?} exceeds max");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhausts() {
        let mut b = ExponentialBackoff::new(BackoffConfig {
            initial_interval_ms: 1_000,
            multiplier: 1.0,
            max_elapsed_ms: 2_500,
            ..no_jitter()
        });
        assert!(b.next_backoff().is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(b.next_backoff().is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        // 2s elapsed + 1s delay would overrun the 2.5s budget.
        assert!(b.next_backoff().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_checked_against_capped_delay() {
        // Jitter may push the raw delay to 1.5s; only the 1s cap counts.
        let mut b = ExponentialBackoff::new(BackoffConfig {
            initial_interval_ms: 1_000,
            multiplier: 1.0,
            randomization_factor: 0.5,
            max_interval_ms: 1_000,
            max_elapsed_ms: 1_000,
        });
        for _ in 0..50 {
            let mut fresh = ExponentialBackoff::new(b.config.clone());
            let d = fresh.next_backoff().expect("capped delay fits the budget");
            assert!(d <= Duration::from_millis(1_000));
        }
        assert!(b.next_backoff().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_stays_within_bounds() {
        let mut b = ExponentialBackoff::new(BackoffConfig {
            initial_interval_ms: 1_000,
            multiplier: 1.0,
            randomization_factor: 0.5,
            ..Default::default()
        });
        for _ in 0..20 {
            let d = b.next_backoff().unwrap();
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1_500));
        }
    }
}
