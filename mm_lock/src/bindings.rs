use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::guard::LockGuard;
use crate::manager::LockManager;
use crate::types::LockType;

/// Named trading-platform resources with fixed naming and lock mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// Order placement for a symbol
    Trading(String),

    /// Signal processing for a symbol
    Signal(String),

    /// Portfolio-wide state
    Portfolio,

    /// Risk evaluation for a symbol
    Risk(String),
}

impl ResourceKey {
    pub fn trading(symbol: impl Into<String>) -> Self {
        ResourceKey::Trading(symbol.into())
    }

    pub fn signal(symbol: impl Into<String>) -> Self {
        ResourceKey::Signal(symbol.into())
    }

    pub fn risk(symbol: impl Into<String>) -> Self {
        ResourceKey::Risk(symbol.into())
    }

    /// Resource name in the lock table
    pub fn resource(&self) -> String {
        self.to_string()
    }

    pub fn lock_type(&self) -> LockType {
        match self {
            ResourceKey::Trading(_) | ResourceKey::Portfolio => LockType::Exclusive,
            ResourceKey::Signal(_) | ResourceKey::Risk(_) => LockType::Write,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Trading(symbol) => write!(f, "trading:{symbol}"),
            ResourceKey::Signal(symbol) => write!(f, "signal:{symbol}"),
            ResourceKey::Portfolio => f.write_str("portfolio"),
            ResourceKey::Risk(symbol) => write!(f, "risk:{symbol}"),
        }
    }
}

impl LockManager {
    /// Lock `key` in its conventional mode
    pub async fn lock_key(&self, key: &ResourceKey, owner: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        self.lock(&key.resource(), key.lock_type(), owner, timeout).await
    }

    pub async fn trading_lock(&self, symbol: &str, owner: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        self.lock_key(&ResourceKey::trading(symbol), owner, timeout).await
    }

    pub async fn signal_lock(&self, symbol: &str, owner: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        self.lock_key(&ResourceKey::signal(symbol), owner, timeout).await
    }

    pub async fn portfolio_lock(&self, owner: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        self.lock_key(&ResourceKey::Portfolio, owner, timeout).await
    }

    pub async fn risk_lock(&self, symbol: &str, owner: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        self.lock_key(&ResourceKey::risk(symbol), owner, timeout).await
    }
}
