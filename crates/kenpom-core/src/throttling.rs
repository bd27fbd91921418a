use std::fmt::{Debug, Formatter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::Quota;
use tracing::debug;

type DirectRateLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Process-wide outbound request budget.
///
/// Token bucket refilled at `requests_per_second` with capacity `burst`.
/// Clones share one bucket, so every executor handed a clone draws from the
/// same budget.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Option<Arc<DirectRateLimiter>>,
    requests_per_second: f64,
    burst: u32,
}

impl RateLimiter {
    /// Creates a limiter; a non-positive or non-finite rate disables limiting.
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let burst = burst.max(1);
        let limiter = quota_for_rate(requests_per_second, burst)
            .map(|quota| Arc::new(DirectRateLimiter::direct(quota)));

        Self {
            limiter,
            requests_per_second,
            burst,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0.0, 1)
    }

    pub const fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    pub const fn burst(&self) -> u32 {
        self.burst
    }

    pub fn is_unlimited(&self) -> bool {
        self.limiter.is_none()
    }

    /// Waits until one more request may leave the process. Never fails.
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        if let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            debug!(wait_ms = wait.as_millis() as u64, "rate limiter delaying request");
            limiter.until_ready().await;
        }
    }

    /// Takes a permit if one is available, otherwise returns the wait until the next one.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

impl Debug for RateLimiter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .field("unlimited", &self.is_unlimited())
            .finish()
    }
}

fn quota_for_rate(requests_per_second: f64, burst: u32) -> Option<Quota> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return None;
    }

    let period = Duration::from_secs_f64(1.0 / requests_per_second);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(period).map(|quota| quota.allow_burst(burst))
}
