use std::time::Duration;

use tokio::time::Instant;

use crate::limiter::Quota;
use crate::limiter::WindowState;

/// Fixed window counter for a single identifier
///
/// The window restarts at the first request observed after the previous
/// window has fully elapsed, and the counter resets to zero with it.
#[derive(Debug, Clone)]
pub(crate) struct FixedWindowState {
    /// Start of the current window
    window_start: Instant,

    /// Requests admitted in the current window
    count: u32,
}

impl FixedWindowState {
    pub fn new(now: Instant) -> Self {
        Self { window_start: now, count: 0 }
    }

    /// Reset the counter if the current window has expired
    #[inline(always)]
    fn roll(&mut self, now: Instant, quota: &Quota) {
        if now.saturating_duration_since(self.window_start) >= quota.window {
            self.window_start = now;
            self.count = 0;
        }
    }
}

impl WindowState for FixedWindowState {
    fn try_admit(&mut self, now: Instant, quota: &Quota) -> bool {
        self.roll(now, quota);

        if self.count < quota.max_requests {
            self.count += 1;
            true
        } else {
            false
        }
    }

    fn retry_after(&mut self, now: Instant, quota: &Quota) -> Duration {
        self.roll(now, quota);

        if self.count < quota.max_requests {
            return Duration::ZERO;
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        quota.window.saturating_sub(elapsed)
    }

    fn available(&mut self, now: Instant, quota: &Quota) -> u32 {
        self.roll(now, quota);
        quota.max_requests.saturating_sub(self.count)
    }
}
