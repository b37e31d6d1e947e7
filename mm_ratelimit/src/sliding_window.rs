use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::limiter::Quota;
use crate::limiter::WindowState;

/// Sliding window log for a single identifier
///
/// Keeps the timestamp of every admission inside the trailing window, oldest
/// first. An entry exactly one window old no longer counts.
#[derive(Debug, Clone, Default)]
pub(crate) struct SlidingWindowState {
    requests: VecDeque<Instant>,
}

impl SlidingWindowState {
    pub fn new() -> Self {
        Self { requests: VecDeque::new() }
    }

    /// Drop admissions that have left the window
    #[inline(always)]
    fn prune(&mut self, now: Instant, quota: &Quota) {
        while let Some(oldest) = self.requests.front() {
            if now.saturating_duration_since(*oldest) >= quota.window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.requests.len()
    }
}

impl WindowState for SlidingWindowState {
    fn try_admit(&mut self, now: Instant, quota: &Quota) -> bool {
        self.prune(now, quota);

        if self.requests.len() < quota.max_requests as usize {
            self.requests.push_back(now);
            true
        } else {
            false
        }
    }

    fn retry_after(&mut self, now: Instant, quota: &Quota) -> Duration {
        self.prune(now, quota);

        if self.requests.len() < quota.max_requests as usize {
            return Duration::ZERO;
        }

        match self.requests.front() {
            Some(oldest) => (*oldest + quota.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    fn available(&mut self, now: Instant, quota: &Quota) -> u32 {
        self.prune(now, quota);
        quota.max_requests.saturating_sub(self.requests.len() as u32)
    }
}
