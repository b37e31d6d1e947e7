//! AI provider quotas
//!
//! LLM completion APIs meter requests per minute and return 429 with a
//! retry hint when exceeded. A leaky bucket spreads scoring calls evenly
//! instead of front-loading them at the start of each minute.

use std::time::Duration;

use crate::RateLimitStrategy;
use crate::ServiceLimitConfig;

/// 50 requests per minute, drained evenly
pub fn default_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(50, Duration::from_secs(60), RateLimitStrategy::LeakyBucket)
        .with_burst_limit(5)
        .with_backoff(2.0, Duration::from_secs(120))
}

/// Higher usage tier: 500 requests per minute
pub fn scale_tier_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(500, Duration::from_secs(60), RateLimitStrategy::LeakyBucket)
        .with_burst_limit(25)
        .with_backoff(2.0, Duration::from_secs(60))
}
