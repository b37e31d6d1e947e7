use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use time::OffsetDateTime;

/// Snapshot of a limiter's cumulative admission counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub allowed: u64,
    pub blocked: u64,
    pub total: u64,

    /// When the counters were last reset
    pub since: OffsetDateTime,
}

impl RateLimiterStats {
    /// Fraction of checks that were rejected, 0.0 when nothing was checked
    pub fn block_rate(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.blocked as f64 / self.total as f64 }
    }
}

#[derive(Debug)]
pub(crate) struct StatsCounters {
    allowed: AtomicU64,
    blocked: AtomicU64,
    since: Mutex<OffsetDateTime>,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self { allowed: AtomicU64::new(0), blocked: AtomicU64::new(0), since: Mutex::new(OffsetDateTime::now_utc()) }
    }

    #[inline(always)]
    pub fn record(&self, admitted: bool) {
        if admitted {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> RateLimiterStats {
        let since = *self.since.lock();
        let allowed = self.allowed.load(Ordering::Relaxed);
        let blocked = self.blocked.load(Ordering::Relaxed);
        RateLimiterStats { allowed, blocked, total: allowed + blocked, since }
    }

    pub fn reset(&self) {
        let mut since = self.since.lock();
        self.allowed.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
        *since = OffsetDateTime::now_utc();
    }
}
