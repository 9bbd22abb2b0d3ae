use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared request budget for history lookups.
///
/// Cloning shares the budget, so every pipeline worker draws from the same
/// quota.
#[derive(Clone)]
pub struct FetchThrottle {
    limiter: Arc<DirectRateLimiter>,
    per_minute: NonZeroU32,
}

impl FetchThrottle {
    /// Allows `per_minute` lookups per minute, spread evenly, with a burst
    /// of the same size.
    pub fn per_minute(per_minute: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            per_minute,
        }
    }

    pub fn from_limit(per_minute: u32) -> Option<Self> {
        NonZeroU32::new(per_minute).map(Self::per_minute)
    }

    pub fn limit(&self) -> u32 {
        self.per_minute.get()
    }

    /// Takes one unit of budget if available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Waits until one unit of budget is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Average spacing between lookups once the burst is spent.
    pub fn spacing(&self) -> Duration {
        Duration::from_secs(60) / self.per_minute.get()
    }
}

impl std::fmt::Debug for FetchThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchThrottle")
            .field("per_minute", &self.per_minute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_burst_then_blocks() {
        let throttle = FetchThrottle::from_limit(2).expect("non-zero limit");

        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
        assert_eq!(throttle.spacing(), Duration::from_secs(30));
    }

    #[test]
    fn zero_limit_disables_throttling() {
        assert!(FetchThrottle::from_limit(0).is_none());
    }

    #[tokio::test]
    async fn clones_share_budget() {
        let throttle = FetchThrottle::from_limit(1).expect("non-zero limit");
        let clone = throttle.clone();

        throttle.acquire().await;
        assert!(!clone.try_acquire());
    }
}
