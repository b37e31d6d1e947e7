use std::fmt;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::Instant;

/// Stand-in for an unbounded deadline, about 30 years out
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + duration`, saturating to a far-future instant instead of overflowing
pub(crate) fn deadline_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Access mode requested for a resource
///
/// Ordered by strength. `Write` and `Exclusive` both exclude every other
/// holder; `Exclusive` is the convention for order-placement sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockType {
    Read,
    Write,
    Exclusive,
}

impl LockType {
    /// Whether holders of this type can coexist
    #[inline(always)]
    pub fn is_shared(&self) -> bool {
        matches!(self, LockType::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Read => "read",
            LockType::Write => "write",
            LockType::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Acquired,
    Released,
    TimedOut,
    ForceReleased,
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            LockStatus::Acquired => "acquired",
            LockStatus::Released => "released",
            LockStatus::TimedOut => "timed_out",
            LockStatus::ForceReleased => "force_released",
        };
        f.write_str(status)
    }
}

/// One owner's grant on a resource
#[derive(Debug, Clone, PartialEq)]
pub struct LockHolder {
    pub owner: String,
    pub lock_type: LockType,
    pub acquired_at: Instant,
    pub expires_at: Instant,

    /// Wall clock time of the grant, for logs and dashboards
    pub acquired_wall: OffsetDateTime,
}

impl LockHolder {
    pub(crate) fn new(owner: &str, lock_type: LockType, now: Instant, ttl: Duration) -> Self {
        Self { owner: owner.to_string(), lock_type, acquired_at: now, expires_at: deadline_after(now, ttl), acquired_wall: OffsetDateTime::now_utc() }
    }

    #[inline(always)]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Time left before the sweeper may reclaim this grant
    pub fn remaining_ttl(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Read-only view of a held resource
#[derive(Debug, Clone, PartialEq)]
pub struct LockInfo {
    pub resource: String,

    /// Strongest type among the holders
    pub lock_type: LockType,
    pub status: LockStatus,
    pub holders: Vec<LockHolder>,

    /// Acquirers currently registered as waiting
    pub waiting: usize,
}

impl LockInfo {
    pub fn is_held_by(&self, owner: &str) -> bool {
        self.holders.iter().any(|holder| holder.owner == owner)
    }

    pub fn owners(&self) -> Vec<&str> {
        self.holders.iter().map(|holder| holder.owner.as_str()).collect()
    }
}

/// Counters and gauges for the whole lock table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockManagerStats {
    /// Resources with at least one live holder
    pub held_resources: usize,
    pub total_holders: usize,
    pub waiting: usize,
    pub grants: u64,
    pub releases: u64,
    pub timeouts: u64,
    pub force_releases: u64,
}
