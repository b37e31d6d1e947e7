use std::time::Duration;

use serde::Deserialize;

use crate::error::LockError;
use crate::error::Result;

/// Lock manager timing, durations in seconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LockManagerConfig {
    /// Wait budget when `acquire` is called without a timeout
    pub default_wait_timeout_secs: f64,

    /// Grant TTL when `acquire` is called without a timeout
    pub default_lock_ttl_secs: f64,

    /// Lower clamp for a TTL derived from a requested timeout
    pub min_lock_ttl_secs: f64,

    /// Upper clamp for a TTL derived from a requested timeout
    pub max_lock_ttl_secs: f64,

    /// How often the background sweeper reclaims expired grants
    pub sweep_interval_secs: f64,
}

impl Default for LockManagerConfig {
    fn default() -> Self {
        Self {
            default_wait_timeout_secs: 30.0,
            default_lock_ttl_secs: 300.0,
            min_lock_ttl_secs: 1.0,
            max_lock_ttl_secs: 3_600.0,
            sweep_interval_secs: 60.0,
        }
    }
}

fn positive_secs(name: &str, secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(LockError::InvalidConfig(format!("{name} must be positive, got {secs}")));
    }
    Duration::try_from_secs_f64(secs).map_err(|err| LockError::InvalidConfig(format!("{name}: {err}")))
}

impl LockManagerConfig {
    pub fn validate(&self) -> Result<()> {
        positive_secs("default_wait_timeout_secs", self.default_wait_timeout_secs)?;
        positive_secs("default_lock_ttl_secs", self.default_lock_ttl_secs)?;
        positive_secs("sweep_interval_secs", self.sweep_interval_secs)?;
        let min = positive_secs("min_lock_ttl_secs", self.min_lock_ttl_secs)?;
        let max = positive_secs("max_lock_ttl_secs", self.max_lock_ttl_secs)?;
        if min > max {
            return Err(LockError::InvalidConfig(format!(
                "min_lock_ttl_secs ({}) exceeds max_lock_ttl_secs ({})",
                self.min_lock_ttl_secs, self.max_lock_ttl_secs
            )));
        }
        Ok(())
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs_f64();
        self
    }

    pub fn with_ttl_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_lock_ttl_secs = min.as_secs_f64();
        self.max_lock_ttl_secs = max.as_secs_f64();
        self
    }

    pub fn with_defaults(mut self, wait_timeout: Duration, lock_ttl: Duration) -> Self {
        self.default_wait_timeout_secs = wait_timeout.as_secs_f64();
        self.default_lock_ttl_secs = lock_ttl.as_secs_f64();
        self
    }
}

/// Durations resolved once from a validated [`LockManagerConfig`]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timing {
    pub default_wait_timeout: Duration,
    pub default_lock_ttl: Duration,
    pub min_lock_ttl: Duration,
    pub max_lock_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Timing {
    pub fn from_config(config: &LockManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            default_wait_timeout: positive_secs("default_wait_timeout_secs", config.default_wait_timeout_secs)?,
            default_lock_ttl: positive_secs("default_lock_ttl_secs", config.default_lock_ttl_secs)?,
            min_lock_ttl: positive_secs("min_lock_ttl_secs", config.min_lock_ttl_secs)?,
            max_lock_ttl: positive_secs("max_lock_ttl_secs", config.max_lock_ttl_secs)?,
            sweep_interval: positive_secs("sweep_interval_secs", config.sweep_interval_secs)?,
        })
    }

    /// TTL granted for a request: the requested timeout clamped to the
    /// configured bounds, or the default TTL when none was requested
    pub fn granted_ttl(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(timeout) => timeout.clamp(self.min_lock_ttl, self.max_lock_ttl),
            None => self.default_lock_ttl,
        }
    }

    pub fn wait_budget(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default_wait_timeout)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            default_wait_timeout: Duration::from_secs(30),
            default_lock_ttl: Duration::from_secs(300),
            min_lock_ttl: Duration::from_secs(1),
            max_lock_ttl: Duration::from_secs(3_600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
