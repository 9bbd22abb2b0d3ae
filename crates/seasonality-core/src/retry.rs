//! Retry policy with capped exponential backoff and jitter.

use std::time::Duration;

/// Statuses worth another attempt: timeouts, throttling and server errors.
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// How many times, and how patiently, an upstream call is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Spread each delay uniformly over +/- 50%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn none() -> Self {
        Self::with_max_retries(0)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.nominal_delay(attempt);
        if !self.jitter {
            return delay;
        }

        let half = delay.as_millis() as u64 / 2;
        let spread = fastrand::u64(0..=half * 2);
        Duration::from_millis(delay.as_millis() as u64 - half + spread)
    }

    /// Longest possible sleep between attempts, summed over every retry.
    pub fn max_total_backoff(&self) -> Duration {
        let nominal = (0..self.max_retries)
            .map(|attempt| self.nominal_delay(attempt))
            .sum::<Duration>();
        if self.jitter {
            nominal + nominal / 2
        } else {
            nominal
        }
    }

    /// Timeout for a single attempt such that every attempt plus the
    /// backoff between them fits inside `budget`.
    ///
    /// When the backoff alone would exhaust the budget, the budget is split
    /// evenly across attempts.
    pub fn attempt_timeout(&self, budget: Duration) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let available = budget
            .checked_sub(self.max_total_backoff())
            .filter(|left| !left.is_zero())
            .unwrap_or(budget);
        (available / attempts).max(Duration::from_millis(1))
    }

    fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = (self.base_delay.as_secs_f64() * self.factor.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(seconds)
    }
}
