use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::clock::Clock;

use super::price_constants::{RATE_LIMIT_COOLDOWN_MS, RATE_LIMIT_DELAY_MS};

#[derive(Debug, Default)]
struct LimiterState {
    last_call_ms: i64,
    rate_limited_at_ms: Option<i64>,
}

/// Pacing and cooldown state for the remote price API, owned by one
/// `PriceService` instance (not process-wide statics) so independent caches
/// never cross-contaminate.
///
/// Two mechanisms: a fixed-delay pace of at most one call per
/// `RATE_LIMIT_DELAY_MS`, and a cooldown window after a 429 during which no
/// remote call is attempted at all.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    min_interval_ms: i64,
    cooldown_ms: i64,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_intervals(clock, RATE_LIMIT_DELAY_MS, RATE_LIMIT_COOLDOWN_MS)
    }

    pub fn with_intervals(clock: Arc<dyn Clock>, min_interval_ms: i64, cooldown_ms: i64) -> Self {
        RateLimiter {
            clock,
            min_interval_ms,
            cooldown_ms,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// True while a previous 429 is still fresh. An expired window clears the
    /// flag as a side effect, mirroring a successful reset.
    pub fn in_cooldown(&self) -> bool {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        match state.rate_limited_at_ms {
            Some(at) => {
                let elapsed = self.clock.now_ms() - at;
                if elapsed < self.cooldown_ms {
                    true
                } else {
                    debug!("Rate limit cooldown expired, remote calls allowed again");
                    state.rate_limited_at_ms = None;
                    false
                }
            }
            None => false,
        }
    }

    /// Sleeps out the remainder of the fixed delay since the previous call,
    /// then stamps this call. Callers serialize overlapping resolutions, so
    /// pacing is sequential by construction.
    pub async fn pace(&self) {
        let wait_ms = {
            let state = self.state.lock().expect("limiter lock poisoned");
            let elapsed = self.clock.now_ms() - state.last_call_ms;
            self.min_interval_ms - elapsed
        };

        if wait_ms > 0 {
            tokio::time::sleep(Duration::from_millis(wait_ms as u64)).await;
        }

        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.last_call_ms = self.clock.now_ms();
    }

    /// Records a fresh 429; (re)starts the cooldown window.
    pub fn note_rate_limited(&self) {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.rate_limited_at_ms = Some(self.clock.now_ms());
        warn!(
            "Price API rate limited; using cache only for the next {}s",
            self.cooldown_ms / 1000
        );
    }

    /// A successful remote call clears the cooldown flag.
    pub fn note_success(&self) {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.rate_limited_at_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn cooldown_expires_after_window() {
        let clock = ManualClock::new(1_000_000);
        let limiter = RateLimiter::new(clock.clone());

        assert!(!limiter.in_cooldown());
        limiter.note_rate_limited();
        assert!(limiter.in_cooldown());

        clock.advance_ms(RATE_LIMIT_COOLDOWN_MS - 1);
        assert!(limiter.in_cooldown());

        clock.advance_ms(2);
        assert!(!limiter.in_cooldown());
    }

    #[test]
    fn success_clears_cooldown() {
        let clock = ManualClock::new(1_000_000);
        let limiter = RateLimiter::new(clock);

        limiter.note_rate_limited();
        assert!(limiter.in_cooldown());
        limiter.note_success();
        assert!(!limiter.in_cooldown());
    }
}
