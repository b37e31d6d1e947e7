use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::error::LockError;
use crate::error::Result;
use crate::manager::Grant;
use crate::manager::LockManager;
use crate::types::LockType;

/// A held lock, released when dropped
///
/// Dropping the guard covers every exit path of the owning scope: early
/// return, `?`, panic unwinding and cancellation of the enclosing future.
///
/// A guard taken while the same owner already holds the resource is nested:
/// it shares the outer grant and dropping it leaves the lock held. A mode
/// upgrade made through a nested guard lasts until the outer grant goes.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard {
    manager: LockManager,
    resource: String,
    owner: String,
    lock_type: LockType,
    nested: bool,
    released: bool,
}

impl LockGuard {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    /// Whether this guard re-entered a grant its owner already held
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// Release now, returning whether the grant was still held
    ///
    /// `false` means the grant had already expired or been force released.
    /// A nested guard leaves the outer grant in place.
    pub fn release(mut self) -> bool {
        self.released = true;
        if self.nested {
            return self.manager.is_held_by(&self.resource, &self.owner);
        }
        self.manager.release(&self.resource, &self.owner)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.nested {
            debug!(resource = %self.resource, owner = %self.owner, "Nested guard dropped, outer grant kept");
            return;
        }
        if !self.manager.release(&self.resource, &self.owner) {
            warn!(resource = %self.resource, owner = %self.owner, "Lock was no longer held when its guard dropped");
        }
    }
}

impl LockManager {
    /// Acquire and wrap the grant in a [`LockGuard`]
    ///
    /// # Errors
    ///
    /// [`LockError::AcquireTimeout`] when the wait budget runs out.
    ///
    /// Locking a resource the owner already holds returns a nested guard
    /// whose drop does not release the outer grant.
    pub async fn lock(&self, resource: &str, lock_type: LockType, owner: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        let start = Instant::now();
        let Some(grant) = self.acquire_grant(resource, lock_type, owner, timeout).await else {
            return Err(LockError::AcquireTimeout { resource: resource.to_string(), owner: owner.to_string(), waited: start.elapsed() });
        };

        let nested = grant == Grant::Reentrant;
        Ok(LockGuard { manager: self.clone(), resource: resource.to_string(), owner: owner.to_string(), lock_type, nested, released: false })
    }

    /// Run `f` while holding `resource`, releasing afterwards whatever `f` does
    pub async fn with_lock<F, Fut, T>(&self, resource: &str, lock_type: LockType, owner: &str, timeout: Option<Duration>, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock(resource, lock_type, owner, timeout).await?;
        Ok(f().await)
    }
}
