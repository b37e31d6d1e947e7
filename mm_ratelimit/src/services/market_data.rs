//! Market data and news API quotas
//!
//! Third-party data vendors typically publish a per-second or per-minute
//! allowance on free and starter plans. Token buckets let a caller backfill
//! a handful of symbols at once and then settle at the sustained rate.

use std::time::Duration;

use crate::RateLimitStrategy;
use crate::ServiceLimitConfig;

/// Starter plan: 5 requests per second sustained, bursts of 10
pub fn default_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(5, Duration::from_secs(1), RateLimitStrategy::TokenBucket)
        .with_burst_limit(10)
        .with_backoff(2.0, Duration::from_secs(30))
}

/// Free plan: 5 requests per minute
pub fn free_tier_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(5, Duration::from_secs(60), RateLimitStrategy::SlidingWindow)
        .with_backoff(2.0, Duration::from_secs(120))
}

/// Headline feed: 100 requests per day
pub fn news_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(100, Duration::from_secs(86_400), RateLimitStrategy::FixedWindow)
        .with_backoff(2.0, Duration::from_secs(3_600))
}
