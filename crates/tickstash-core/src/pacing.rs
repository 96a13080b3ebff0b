use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tracing::debug;

use crate::provider_policy::ProviderPolicy;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared pacing state for every upstream call.
///
/// [`RequestPacer::admit`] waits for quota before a call and
/// [`RequestPacer::pace`] sleeps a fixed delay after it. Neither ever fails.
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Option<Arc<DirectRateLimiter>>,
    delay: Duration,
    paced: Arc<AtomicU64>,
}

impl RequestPacer {
    pub fn new(delay: Duration, quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            limiter: Some(Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            )))),
            delay,
            paced: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.pacing_delay, policy.quota_window, policy.quota_limit)
    }

    /// No quota gate and no delay.
    pub fn disabled() -> Self {
        Self {
            limiter: None,
            delay: Duration::ZERO,
            paced: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait until the quota admits one more call.
    pub async fn admit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Sleep the fixed post-call delay.
    pub async fn pace(&self) {
        self.paced.fetch_add(1, Ordering::Relaxed);
        if self.delay.is_zero() {
            return;
        }
        debug!(delay_ms = self.delay.as_millis() as u64, "pacing after upstream call");
        tokio::time::sleep(self.delay).await;
    }

    /// Number of completed [`RequestPacer::pace`] calls.
    pub fn paced_calls(&self) -> u64 {
        self.paced.load(Ordering::Relaxed)
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn disabled_pacer_never_waits_but_counts() {
        let pacer = RequestPacer::disabled();
        let started = Instant::now();
        for _ in 0..3 {
            pacer.admit().await;
            pacer.pace().await;
        }
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(pacer.paced_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pace_sleeps_the_configured_delay() {
        let pacer = RequestPacer::new(Duration::from_secs(5), Duration::from_secs(60), 12);
        let started = tokio::time::Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn admit_passes_within_burst() {
        let pacer = RequestPacer::new(Duration::ZERO, Duration::from_secs(60), 2);
        let started = Instant::now();
        pacer.admit().await;
        pacer.admit().await;
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn zero_quota_limit_is_clamped_to_one() {
        let quota = quota_from_window(Duration::from_secs(60), 0);
        assert_eq!(quota.burst_size().get(), 1);
    }
}
