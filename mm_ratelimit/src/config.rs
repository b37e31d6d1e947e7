use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::RateLimitError;
use crate::error::Result;
use crate::time::secs_to_window;

/// Admission algorithm used by a [`RateLimiter`](crate::RateLimiter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitStrategy {
    /// Counter that resets at discrete window boundaries
    FixedWindow,
    /// Trailing log of admission timestamps
    SlidingWindow,
    /// Fractional tokens refilled at a constant rate
    TokenBucket,
    /// Same refill model as the token bucket, named for the drain view
    LeakyBucket,
    /// Always admit. Only produced by a fail-open misconfiguration fallback
    Permissive,
}

impl RateLimitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitStrategy::FixedWindow => "fixed_window",
            RateLimitStrategy::SlidingWindow => "sliding_window",
            RateLimitStrategy::TokenBucket => "token_bucket",
            RateLimitStrategy::LeakyBucket => "leaky_bucket",
            RateLimitStrategy::Permissive => "permissive",
        }
    }

    /// Parse a configured strategy name, applying `policy` to unknown names
    pub fn resolve(name: &str, policy: MisconfigPolicy) -> Result<Self> {
        match name.parse::<RateLimitStrategy>() {
            Ok(strategy) => Ok(strategy),
            Err(err) => match policy {
                MisconfigPolicy::FailOpen => {
                    warn!(strategy = %name, "Unknown rate limit strategy, admitting all requests");
                    Ok(RateLimitStrategy::Permissive)
                }
                MisconfigPolicy::FailClosed => Err(err),
            },
        }
    }
}

impl FromStr for RateLimitStrategy {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fixed_window" | "fixed" => Ok(RateLimitStrategy::FixedWindow),
            "sliding_window" | "sliding" => Ok(RateLimitStrategy::SlidingWindow),
            "token_bucket" => Ok(RateLimitStrategy::TokenBucket),
            "leaky_bucket" => Ok(RateLimitStrategy::LeakyBucket),
            _ => Err(RateLimitError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for RateLimitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when configuration names a strategy or service that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisconfigPolicy {
    /// Admit the request and log a warning
    #[default]
    FailOpen,
    /// Reject the request (or refuse to build the limiter)
    FailClosed,
}

/// Quota for one external service, as supplied at startup
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceLimitConfig {
    pub max_requests: u32,

    /// Window length in seconds
    pub time_window_secs: f64,

    /// Strategy name, see [`RateLimitStrategy`]
    pub strategy: String,

    /// Bucket capacity for token/leaky bucket tiers (defaults to `max_requests`)
    pub burst_limit: Option<u32>,

    /// Multiplier applied per consecutive rejection
    pub backoff_factor: f64,

    /// Upper bound on the computed backoff delay, in seconds
    pub max_backoff_secs: f64,
}

impl Default for ServiceLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            time_window_secs: 60.0,
            strategy: RateLimitStrategy::SlidingWindow.as_str().to_string(),
            burst_limit: None,
            backoff_factor: 2.0,
            max_backoff_secs: 60.0,
        }
    }
}

impl ServiceLimitConfig {
    pub fn new(max_requests: u32, time_window: Duration, strategy: RateLimitStrategy) -> Self {
        Self { max_requests, time_window_secs: time_window.as_secs_f64(), strategy: strategy.as_str().to_string(), ..Self::default() }
    }

    pub fn with_burst_limit(mut self, burst_limit: u32) -> Self {
        self.burst_limit = Some(burst_limit);
        self
    }

    pub fn with_backoff(mut self, factor: f64, max_backoff: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_backoff_secs = max_backoff.as_secs_f64();
        self
    }

    pub fn time_window(&self) -> Result<Duration> {
        secs_to_window(self.time_window_secs)
            .ok_or_else(|| RateLimitError::InvalidConfig(format!("time_window_secs must be positive, got {}", self.time_window_secs)))
    }

    pub fn max_backoff(&self) -> Duration {
        secs_to_window(self.max_backoff_secs).unwrap_or(Duration::ZERO)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(RateLimitError::InvalidConfig("max_requests must be greater than 0".to_string()));
        }
        self.time_window()?;
        if self.burst_limit == Some(0) {
            return Err(RateLimitError::InvalidConfig("burst_limit must be greater than 0".to_string()));
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(RateLimitError::InvalidConfig(format!("backoff_factor must be >= 1.0, got {}", self.backoff_factor)));
        }
        if self.max_backoff_secs.is_nan() || self.max_backoff_secs < 0.0 {
            return Err(RateLimitError::InvalidConfig(format!("max_backoff_secs must be >= 0, got {}", self.max_backoff_secs)));
        }
        Ok(())
    }
}
