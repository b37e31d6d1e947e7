use std::time::Duration;

use tokio::time::Instant;

use crate::limiter::Quota;
use crate::limiter::WindowState;

/// Slack applied when comparing fractional token counts against a whole token,
/// so that sleeping exactly one regeneration interval always admits
const TOKEN_EPSILON: f64 = 1e-6;

/// Token bucket for a single identifier
///
/// Backs both the token bucket and leaky bucket strategies: tokens "leak"
/// back in continuously at `max_requests / time_window` per second, are
/// clamped to the bucket capacity on every refill, and each admission
/// consumes one whole token.
#[derive(Debug, Clone)]
pub(crate) struct BucketState {
    /// Current number of available tokens
    tokens: f64,

    /// Time of the last refill
    last_refill: Instant,
}

impl BucketState {
    /// A new bucket starts full
    pub fn new(now: Instant, quota: &Quota) -> Self {
        Self { tokens: quota.capacity, last_refill: now }
    }

    /// Add tokens for the time elapsed since the last refill
    #[inline(always)]
    fn refill(&mut self, now: Instant, quota: &Quota) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * quota.refill_per_sec).min(quota.capacity);
            self.last_refill = now;
        }
    }

    #[inline(always)]
    fn has_token(&self) -> bool {
        self.tokens + TOKEN_EPSILON >= 1.0
    }

    pub fn tokens(&mut self, now: Instant, quota: &Quota) -> f64 {
        self.refill(now, quota);
        self.tokens
    }
}

impl WindowState for BucketState {
    fn try_admit(&mut self, now: Instant, quota: &Quota) -> bool {
        self.refill(now, quota);

        if self.has_token() {
            self.tokens = (self.tokens - 1.0).max(0.0);
            true
        } else {
            false
        }
    }

    fn retry_after(&mut self, now: Instant, quota: &Quota) -> Duration {
        self.refill(now, quota);

        if self.has_token() {
            return Duration::ZERO;
        }

        quota.token_interval()
    }

    fn available(&mut self, now: Instant, quota: &Quota) -> u32 {
        self.refill(now, quota);
        (self.tokens + TOKEN_EPSILON).floor() as u32
    }
}
