use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::LockManagerConfig;
use crate::config::Timing;
use crate::error::LockError;
use crate::error::Result;
use crate::types::LockHolder;
use crate::types::LockInfo;
use crate::types::LockManagerStats;
use crate::types::LockStatus;
use crate::types::LockType;
use crate::types::deadline_after;

/// How a successful acquisition was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Grant {
    /// The owner did not hold the resource before
    Fresh,
    /// The owner already held it and the existing grant was refreshed
    Reentrant,
}

/// Bookkeeping entry for a task blocked in `acquire`
#[derive(Debug)]
struct Waiter {
    lock_type: LockType,
    owner: String,
}

/// State of one named resource
///
/// Invariant: `holders` is either a single Write/Exclusive grant or any
/// number of Read grants with distinct owners.
#[derive(Debug, Default)]
struct ResourceSlot {
    holders: Vec<LockHolder>,

    /// Advisory only, grants are not handed out in this order
    waiting: VecDeque<Waiter>,

    /// Fired on every release so waiters re-evaluate immediately
    notify: Arc<Notify>,
}

impl ResourceSlot {
    fn purge_expired(&mut self, now: Instant) -> Vec<LockHolder> {
        let (expired, live): (Vec<_>, Vec<_>) = self.holders.drain(..).partition(|holder| holder.is_expired(now));
        self.holders = live;
        expired
    }

    fn try_grant(&mut self, owner: &str, lock_type: LockType, now: Instant, ttl: Duration) -> Option<Grant> {
        if let Some(pos) = self.holders.iter().position(|holder| holder.owner == owner) {
            // Upgrading out of a shared read needs every other reader gone
            if self.holders.len() > 1 && !lock_type.is_shared() {
                return None;
            }
            let holder = &mut self.holders[pos];
            holder.lock_type = holder.lock_type.max(lock_type);
            holder.expires_at = holder.expires_at.max(deadline_after(now, ttl));
            return Some(Grant::Reentrant);
        }

        let compatible = self.holders.is_empty() || (lock_type.is_shared() && self.holders.iter().all(|holder| holder.lock_type.is_shared()));
        if !compatible {
            return None;
        }
        self.holders.push(LockHolder::new(owner, lock_type, now, ttl));
        Some(Grant::Fresh)
    }

    fn remove_waiter(&mut self, owner: &str, lock_type: LockType) {
        if let Some(pos) = self.waiting.iter().position(|waiter| waiter.owner == owner && waiter.lock_type == lock_type) {
            self.waiting.remove(pos);
        }
    }

    fn next_expiry(&self) -> Option<Instant> {
        self.holders.iter().map(|holder| holder.expires_at).min()
    }

    /// Nothing held, nobody waiting, and no waiter still pinning the notifier
    fn is_idle(&self) -> bool {
        self.holders.is_empty() && self.waiting.is_empty() && Arc::strong_count(&self.notify) == 1
    }

    fn info(&self, resource: &str, now: Instant) -> Option<LockInfo> {
        let holders: Vec<LockHolder> = self.holders.iter().filter(|holder| !holder.is_expired(now)).cloned().collect();
        let lock_type = holders.iter().map(|holder| holder.lock_type).max()?;
        Some(LockInfo { resource: resource.to_string(), lock_type, status: LockStatus::Acquired, holders, waiting: self.waiting.len() })
    }

    #[inline]
    fn wake(&self) {
        self.notify.notify_waiters();
    }
}

#[derive(Debug, Default)]
struct Counters {
    grants: AtomicU64,
    releases: AtomicU64,
    timeouts: AtomicU64,
    force_releases: AtomicU64,
}

#[derive(Debug)]
struct Inner {
    timing: Timing,
    table: DashMap<String, ResourceSlot>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    counters: Counters,
}

impl Inner {
    fn new(timing: Timing) -> Self {
        Self { timing, table: DashMap::new(), sweeper: Mutex::new(None), counters: Counters::default() }
    }

    /// Drop expired holders of `slot`, returning how many were reclaimed
    fn purge(&self, resource: &str, slot: &mut ResourceSlot, now: Instant) -> usize {
        let expired = slot.purge_expired(now);
        for holder in &expired {
            info!(
                resource = %resource,
                owner = %holder.owner,
                lock_type = %holder.lock_type,
                status = %LockStatus::TimedOut,
                "Reclaimed expired lock"
            );
        }
        if !expired.is_empty() {
            self.counters.force_releases.fetch_add(expired.len() as u64, Ordering::Relaxed);
            slot.wake();
        }
        expired.len()
    }

    /// One atomic resolution attempt, run under the slot's entry lock
    fn try_acquire(&self, resource: &str, slot: &mut ResourceSlot, owner: &str, lock_type: LockType, ttl: Duration) -> Option<Grant> {
        let now = Instant::now();
        self.purge(resource, slot, now);

        let grant = slot.try_grant(owner, lock_type, now, ttl)?;
        self.counters.grants.fetch_add(1, Ordering::Relaxed);
        debug!(
            resource = %resource,
            owner = %owner,
            lock_type = %lock_type,
            ttl_ms = ttl.as_millis() as u64,
            reentrant = grant == Grant::Reentrant,
            status = %LockStatus::Acquired,
            "Lock granted"
        );
        Some(grant)
    }

    fn drop_if_idle(&self, resource: &str) {
        self.table.remove_if(resource, |_, slot| slot.is_idle());
    }

    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut reclaimed = 0;
        for mut entry in self.table.iter_mut() {
            let (resource, slot) = entry.pair_mut();
            reclaimed += self.purge(resource, slot, now);
        }
        self.table.retain(|_, slot| !slot.is_idle());
        reclaimed
    }

    fn release_all(&self) -> usize {
        let mut released = 0;
        for mut entry in self.table.iter_mut() {
            let (resource, slot) = entry.pair_mut();
            for holder in slot.holders.drain(..) {
                info!(resource = %resource, owner = %holder.owner, status = %LockStatus::ForceReleased, "Released lock on shutdown");
                released += 1;
            }
            slot.wake();
        }
        self.counters.force_releases.fetch_add(released as u64, Ordering::Relaxed);
        self.table.retain(|_, slot| !slot.is_idle());
        released
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

/// Removes a task's waiting entry however `acquire` exits, including cancellation
///
/// Must drop after the waiter's clone of the slot notifier, otherwise the slot
/// never looks idle.
struct WaitRegistration<'a> {
    inner: &'a Inner,
    resource: &'a str,
    owner: &'a str,
    lock_type: LockType,
}

impl Drop for WaitRegistration<'_> {
    fn drop(&mut self) {
        if let Some(mut slot) = self.inner.table.get_mut(self.resource) {
            slot.remove_waiter(self.owner, self.lock_type);
        }
        self.inner.drop_if_idle(self.resource);
    }
}

async fn sweep_loop(inner: Weak<Inner>, every: Duration) {
    let mut interval = tokio::time::interval_at(deadline_after(Instant::now(), every), every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let reclaimed = inner.sweep_expired();
        if reclaimed > 0 {
            info!(reclaimed, "Lock sweeper reclaimed expired locks");
        }
    }
}

/// In-process lock table for named logical resources
///
/// Resources are plain strings (`trading:BTCUSDT`, `portfolio`, ...). Each
/// resource is either free, held by one Write/Exclusive owner, or shared by
/// any number of Read owners. Every grant carries a TTL; expired grants are
/// purged lazily on the next attempt and periodically by the sweeper started
/// with [`LockManager::start`].
///
/// Cloning is cheap and every clone shares the same table.
#[derive(Debug, Clone)]
pub struct LockManager {
    inner: Arc<Inner>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self { inner: Arc::new(Inner::new(Timing::default())) }
    }
}

impl LockManager {
    pub fn new(config: &LockManagerConfig) -> Result<Self> {
        let timing = Timing::from_config(config)?;
        Ok(Self { inner: Arc::new(Inner::new(timing)) })
    }

    /// Spawn the expiry sweeper on the current tokio runtime
    ///
    /// Calling `start` on a running manager is a no-op.
    ///
    /// # Errors
    ///
    /// [`LockError::NoRuntime`] when called outside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|err| LockError::NoRuntime(err.to_string()))?;

        let mut sweeper = self.inner.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(());
        }

        let every = self.inner.timing.sweep_interval;
        *sweeper = Some(runtime.spawn(sweep_loop(Arc::downgrade(&self.inner), every)));
        info!(sweep_interval_ms = every.as_millis() as u64, "Lock manager started");
        Ok(())
    }

    /// Cancel the sweeper and release every outstanding lock
    ///
    /// Returns the number of grants released.
    pub fn stop(&self) -> usize {
        if let Some(handle) = self.inner.sweeper.lock().take() {
            handle.abort();
        }
        let released = self.inner.release_all();
        info!(released, "Lock manager stopped");
        released
    }

    pub fn is_running(&self) -> bool {
        self.inner.sweeper.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run one sweeper pass now, returning the number of expired grants reclaimed
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// Acquire `resource` in `lock_type` mode for `owner`
    ///
    /// Resolution, evaluated atomically per attempt:
    /// 1. free resource: granted
    /// 2. expired holders are purged first
    /// 3. `owner` already holds it: granted again (TTL refreshed, type upgraded
    ///    if `owner` is the sole holder)
    /// 4. Read on a resource held only by readers: granted, shared
    /// 5. otherwise wait for a release or expiry until `timeout` elapses
    ///
    /// `timeout` defaults to the configured wait budget; the granted TTL is the
    /// requested timeout clamped to the configured bounds, or the default TTL.
    /// Returns `false` on timeout. A timeout too large to represent, such as
    /// `Duration::MAX`, waits indefinitely.
    pub async fn acquire(&self, resource: &str, lock_type: LockType, owner: &str, timeout: Option<Duration>) -> bool {
        self.acquire_grant(resource, lock_type, owner, timeout).await.is_some()
    }

    pub(crate) async fn acquire_grant(&self, resource: &str, lock_type: LockType, owner: &str, timeout: Option<Duration>) -> Option<Grant> {
        let inner = &*self.inner;
        let ttl = inner.timing.granted_ttl(timeout);
        let deadline = deadline_after(Instant::now(), inner.timing.wait_budget(timeout));

        // Declared before `notify` so it drops after it
        let _registration: WaitRegistration<'_>;
        let attempt = {
            let mut slot = inner.table.entry(resource.to_string()).or_default();
            let grant = inner.try_acquire(resource, &mut slot, owner, lock_type, ttl);
            if grant.is_none() {
                slot.waiting.push_back(Waiter { lock_type, owner: owner.to_string() });
            }
            grant.ok_or_else(|| Arc::clone(&slot.notify))
        };
        let notify = match attempt {
            Ok(grant) => return Some(grant),
            Err(notify) => notify,
        };

        _registration = WaitRegistration { inner, resource, owner, lock_type };
        debug!(resource = %resource, owner = %owner, lock_type = %lock_type, "Waiting for lock");

        loop {
            // Register for wakeups before re-checking so a release in between is not missed
            let mut notified = std::pin::pin!(notify.notified());
            notified.as_mut().enable();

            let (grant, wake_at) = {
                let mut slot = inner.table.entry(resource.to_string()).or_default();
                let grant = inner.try_acquire(resource, &mut slot, owner, lock_type, ttl);
                let wake_at = slot.next_expiry().map_or(deadline, |expiry| expiry.min(deadline));
                (grant, wake_at)
            };
            if grant.is_some() {
                return grant;
            }

            if Instant::now() >= deadline {
                inner.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(resource = %resource, owner = %owner, lock_type = %lock_type, "Timed out waiting for lock");
                return None;
            }

            let _ = tokio::time::timeout_at(wake_at, notified).await;
        }
    }

    /// Release `owner`'s grant on `resource`
    ///
    /// Returns `false` when `owner` holds no live grant on it.
    pub fn release(&self, resource: &str, owner: &str) -> bool {
        let released = match self.inner.table.get_mut(resource) {
            Some(mut slot) => {
                self.inner.purge(resource, &mut slot, Instant::now());
                match slot.holders.iter().position(|holder| holder.owner == owner) {
                    Some(pos) => {
                        slot.holders.remove(pos);
                        slot.waiting.pop_front();
                        slot.wake();
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };

        if released {
            self.inner.counters.releases.fetch_add(1, Ordering::Relaxed);
            debug!(resource = %resource, owner = %owner, status = %LockStatus::Released, "Lock released");
            self.inner.drop_if_idle(resource);
        } else {
            debug!(resource = %resource, owner = %owner, "Release ignored, lock not held by owner");
        }
        released
    }

    /// Remove every grant on `resource` regardless of owner
    pub fn force_release(&self, resource: &str) -> bool {
        let released = match self.inner.table.get_mut(resource) {
            Some(mut slot) if !slot.holders.is_empty() => {
                let count = slot.holders.len();
                for holder in slot.holders.drain(..) {
                    info!(resource = %resource, owner = %holder.owner, status = %LockStatus::ForceReleased, "Lock force released");
                }
                slot.wake();
                count
            }
            _ => 0,
        };

        if released == 0 {
            return false;
        }
        self.inner.counters.force_releases.fetch_add(released as u64, Ordering::Relaxed);
        self.inner.drop_if_idle(resource);
        true
    }

    /// Live grants on `resource`, `None` when it is free
    pub fn lock_info(&self, resource: &str) -> Option<LockInfo> {
        let now = Instant::now();
        self.inner.table.get(resource).and_then(|slot| slot.info(resource, now))
    }

    /// Every held resource, sorted by name
    pub fn all_locks(&self) -> Vec<LockInfo> {
        let now = Instant::now();
        let mut locks: Vec<LockInfo> = self.inner.table.iter().filter_map(|entry| entry.value().info(entry.key(), now)).collect();
        locks.sort_by(|a, b| a.resource.cmp(&b.resource));
        locks
    }

    /// Whether `owner` holds a live grant on `resource`
    pub fn is_held_by(&self, resource: &str, owner: &str) -> bool {
        self.lock_info(resource).is_some_and(|info| info.is_held_by(owner))
    }

    /// Resources on which `owner` holds a live grant
    pub fn locks_by_owner(&self, owner: &str) -> Vec<LockInfo> {
        self.all_locks().into_iter().filter(|info| info.is_held_by(owner)).collect()
    }

    pub fn waiting_count(&self, resource: &str) -> usize {
        self.inner.table.get(resource).map_or(0, |slot| slot.waiting.len())
    }

    pub fn stats(&self) -> LockManagerStats {
        let now = Instant::now();
        let mut stats = LockManagerStats::default();
        for entry in self.inner.table.iter() {
            let live = entry.value().holders.iter().filter(|holder| !holder.is_expired(now)).count();
            if live > 0 {
                stats.held_resources += 1;
            }
            stats.total_holders += live;
            stats.waiting += entry.value().waiting.len();
        }

        let counters = &self.inner.counters;
        stats.grants = counters.grants.load(Ordering::Relaxed);
        stats.releases = counters.releases.load(Ordering::Relaxed);
        stats.timeouts = counters.timeouts.load(Ordering::Relaxed);
        stats.force_releases = counters.force_releases.load(Ordering::Relaxed);
        stats
    }

    /// Configured sweeper period
    pub fn sweep_interval(&self) -> Duration {
        self.inner.timing.sweep_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Option<Duration> = Some(Duration::from_secs(1));

    #[tokio::test]
    async fn test_acquire_free_resource() {
        let manager = LockManager::default();

        assert!(manager.acquire("portfolio", LockType::Exclusive, "rebalancer", None).await);

        let info = manager.lock_info("portfolio").unwrap();
        assert_eq!(info.lock_type, LockType::Exclusive);
        assert_eq!(info.owners(), vec!["rebalancer"]);
        assert_eq!(info.status, LockStatus::Acquired);
    }

    #[tokio::test]
    async fn test_reentrant_acquire() {
        let manager = LockManager::default();

        assert!(manager.acquire("trading:ETHUSDT", LockType::Exclusive, "engine", SECOND).await);
        assert!(manager.acquire("trading:ETHUSDT", LockType::Read, "engine", SECOND).await);

        let info = manager.lock_info("trading:ETHUSDT").unwrap();
        assert_eq!(info.holders.len(), 1);
        assert_eq!(info.lock_type, LockType::Exclusive);
    }

    #[tokio::test]
    async fn test_sole_reader_upgrades_in_place() {
        let manager = LockManager::default();

        assert!(manager.acquire("signal:BTCUSDT", LockType::Read, "scorer", SECOND).await);
        assert!(manager.acquire("signal:BTCUSDT", LockType::Write, "scorer", SECOND).await);

        assert_eq!(manager.lock_info("signal:BTCUSDT").unwrap().lock_type, LockType::Write);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_reader_cannot_upgrade_while_others_read() {
        let manager = LockManager::default();

        assert!(manager.acquire("signal:BTCUSDT", LockType::Read, "a", None).await);
        assert!(manager.acquire("signal:BTCUSDT", LockType::Read, "b", None).await);

        assert!(!manager.acquire("signal:BTCUSDT", LockType::Write, "a", Some(Duration::from_millis(50))).await);
        assert_eq!(manager.lock_info("signal:BTCUSDT").unwrap().holders.len(), 2);
    }

    #[tokio::test]
    async fn test_readers_share_and_are_tracked_individually() {
        let manager = LockManager::default();

        assert!(manager.acquire("portfolio", LockType::Read, "risk", SECOND).await);
        assert!(manager.acquire("portfolio", LockType::Read, "dashboard", SECOND).await);

        let info = manager.lock_info("portfolio").unwrap();
        assert_eq!(info.lock_type, LockType::Read);
        assert_eq!(info.holders.len(), 2);

        assert!(manager.release("portfolio", "risk"));
        let info = manager.lock_info("portfolio").unwrap();
        assert_eq!(info.owners(), vec!["dashboard"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_waits_for_readers() {
        let manager = LockManager::default();
        assert!(manager.acquire("portfolio", LockType::Read, "risk", None).await);

        assert!(!manager.acquire("portfolio", LockType::Write, "rebalancer", Some(Duration::from_millis(100))).await);
        assert_eq!(manager.stats().timeouts, 1);
        assert_eq!(manager.waiting_count("portfolio"), 0);
    }

    #[tokio::test]
    async fn test_release_requires_owner() {
        let manager = LockManager::default();
        assert!(manager.acquire("risk:BTCUSDT", LockType::Write, "risk-engine", SECOND).await);

        assert!(!manager.release("risk:BTCUSDT", "intruder"));
        assert!(manager.lock_info("risk:BTCUSDT").is_some());

        assert!(manager.release("risk:BTCUSDT", "risk-engine"));
        assert!(manager.lock_info("risk:BTCUSDT").is_none());
        assert!(!manager.release("risk:BTCUSDT", "risk-engine"));
    }

    #[tokio::test]
    async fn test_force_release() {
        let manager = LockManager::default();
        assert!(manager.acquire("portfolio", LockType::Read, "a", SECOND).await);
        assert!(manager.acquire("portfolio", LockType::Read, "b", SECOND).await);

        assert!(manager.force_release("portfolio"));
        assert!(manager.lock_info("portfolio").is_none());
        assert!(!manager.force_release("portfolio"));
        assert_eq!(manager.stats().force_releases, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_purged_on_acquire() {
        let config = LockManagerConfig::default().with_ttl_bounds(Duration::from_millis(10), Duration::from_secs(60));
        let manager = LockManager::new(&config).unwrap();

        assert!(manager.acquire("trading:SOLUSDT", LockType::Exclusive, "crashed", Some(Duration::from_millis(50))).await);
        tokio::time::advance(Duration::from_millis(60)).await;

        assert!(manager.lock_info("trading:SOLUSDT").is_none());
        assert!(manager.acquire("trading:SOLUSDT", LockType::Exclusive, "engine", Some(Duration::ZERO)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_wakes_on_holder_expiry() {
        let config = LockManagerConfig::default().with_ttl_bounds(Duration::from_millis(10), Duration::from_secs(60));
        let manager = LockManager::new(&config).unwrap();

        assert!(manager.acquire("portfolio", LockType::Exclusive, "crashed", Some(Duration::from_millis(200))).await);

        let start = Instant::now();
        assert!(manager.acquire("portfolio", LockType::Exclusive, "engine", Some(Duration::from_secs(5))).await);
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_is_try_lock() {
        let manager = LockManager::default();
        assert!(manager.acquire("portfolio", LockType::Exclusive, "a", None).await);

        let start = Instant::now();
        assert!(!manager.acquire("portfolio", LockType::Exclusive, "b", Some(Duration::ZERO)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_introspection() {
        let manager = LockManager::default();
        assert!(manager.acquire("trading:BTCUSDT", LockType::Exclusive, "engine", SECOND).await);
        assert!(manager.acquire("trading:ETHUSDT", LockType::Exclusive, "engine", SECOND).await);
        assert!(manager.acquire("portfolio", LockType::Read, "dashboard", SECOND).await);

        let all = manager.all_locks();
        let names: Vec<&str> = all.iter().map(|info| info.resource.as_str()).collect();
        assert_eq!(names, vec!["portfolio", "trading:BTCUSDT", "trading:ETHUSDT"]);

        assert_eq!(manager.locks_by_owner("engine").len(), 2);
        assert_eq!(manager.locks_by_owner("nobody").len(), 0);

        let stats = manager.stats();
        assert_eq!(stats.held_resources, 3);
        assert_eq!(stats.total_holders, 3);
        assert_eq!(stats.grants, 3);
    }

    #[tokio::test]
    async fn test_stop_releases_everything() {
        let manager = LockManager::default();
        manager.start().unwrap();
        assert!(manager.is_running());

        assert!(manager.acquire("trading:BTCUSDT", LockType::Exclusive, "engine", SECOND).await);
        assert!(manager.acquire("portfolio", LockType::Read, "dashboard", SECOND).await);

        assert_eq!(manager.stop(), 2);
        assert!(!manager.is_running());
        assert!(manager.all_locks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_does_not_overflow() {
        let manager = LockManager::default();
        assert!(manager.acquire("portfolio", LockType::Exclusive, "a", Some(Duration::MAX)).await);
        assert_eq!(manager.lock_info("portfolio").unwrap().holders[0].remaining_ttl(Instant::now()), Duration::from_secs(3_600));

        // Waits out the holder's clamped TTL instead of panicking on the deadline
        assert!(manager.acquire("portfolio", LockType::Exclusive, "b", Some(Duration::MAX)).await);
        assert_eq!(manager.lock_info("portfolio").unwrap().owners(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_huge_configured_ttl_does_not_overflow() {
        let config = LockManagerConfig { max_lock_ttl_secs: 1e19, ..LockManagerConfig::default() };
        let manager = LockManager::new(&config).unwrap();

        assert!(manager.acquire("portfolio", LockType::Exclusive, "a", Some(Duration::MAX)).await);
        assert!(manager.acquire("portfolio", LockType::Exclusive, "a", Some(Duration::MAX)).await);
        assert!(manager.lock_info("portfolio").is_some());
        assert_eq!(manager.sweep_expired(), 0);
    }

    #[test]
    fn test_start_outside_runtime_is_an_error() {
        let manager = LockManager::default();

        assert!(matches!(manager.start(), Err(LockError::NoRuntime(_))));
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let manager = LockManager::default();
        manager.start().unwrap();
        manager.start().unwrap();
        assert!(manager.is_running());
        manager.stop();
    }

    #[tokio::test]
    async fn test_idle_slots_are_dropped() {
        let manager = LockManager::default();
        assert!(manager.acquire("portfolio", LockType::Write, "a", SECOND).await);
        assert!(manager.release("portfolio", "a"));

        assert!(manager.inner.table.is_empty());
    }
}
