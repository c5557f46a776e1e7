use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::ProviderId;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Local request budget for one upstream provider.
///
/// An exhausted budget is reported before any network call is made, so the
/// fallback chain moves on instead of burning a free-tier quota.
#[derive(Clone)]
pub struct RateBudget {
    limiter: Arc<DirectRateLimiter>,
    limit: u32,
    window: Duration,
}

impl RateBudget {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
            limit: limit.max(1),
            window,
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(Duration::from_secs(60), limit)
    }

    /// Published free-tier limits.
    pub fn for_provider(provider: ProviderId) -> Self {
        match provider {
            ProviderId::TwelveData => Self::per_minute(8),
            ProviderId::AlphaVantage => Self::per_minute(5),
            ProviderId::Finnhub => Self::per_minute(60),
            ProviderId::Yahoo => Self::per_minute(120),
            ProviderId::Simulated => Self::per_minute(u32::MAX),
        }
    }

    /// Spend one request, or return how long until the next one is allowed.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

impl std::fmt::Debug for RateBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish()
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit.max(1)).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
