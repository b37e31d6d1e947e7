use std::sync::Arc;
use std::time::Duration;

use mm_lock::LockManager;
use mm_ratelimit::MultiTierRateLimiter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing::warn;

use crate::shutdown_handler::ShutdownFlag;

/// Log one snapshot of every rate limit tier and the lock table
///
/// Returns the number of services currently backing off.
pub fn log_stats(limiter: &MultiTierRateLimiter, locks: &LockManager) -> usize {
    let mut backing_off = 0;
    for (service, stats) in limiter.all_stats() {
        if stats.backing_off {
            backing_off += 1;
            warn!(
                service = %service,
                consecutive_rejections = stats.consecutive_rejections,
                block_rate = stats.requests.block_rate(),
                "Service is backing off"
            );
        }
        info!(
            service = %service,
            strategy = %stats.strategy,
            max_requests = stats.max_requests,
            window_ms = stats.time_window.as_millis() as u64,
            allowed = stats.requests.allowed,
            blocked = stats.requests.blocked,
            "Rate limit stats"
        );
    }

    let lock_stats = locks.stats();
    info!(
        held = lock_stats.held_resources,
        holders = lock_stats.total_holders,
        waiting = lock_stats.waiting,
        grants = lock_stats.grants,
        timeouts = lock_stats.timeouts,
        force_releases = lock_stats.force_releases,
        "Lock stats"
    );
    for held in locks.all_locks() {
        info!(resource = %held.resource, lock_type = %held.lock_type, owners = ?held.owners(), waiting = held.waiting, "Held lock");
    }

    backing_off
}

/// Spawns a task that logs stats every `interval` until shutdown
pub fn spawn_stats_reporter(limiter: Arc<MultiTierRateLimiter>, locks: LockManager, interval: Duration, shutdown: ShutdownFlag) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        while shutdown.is_running() {
            ticker.tick().await;
            if !shutdown.is_running() {
                break;
            }
            log_stats(&limiter, &locks);
        }
        info!("Stats reporter exiting");
    })
}
