//! Exchange REST API quotas
//!
//! Modelled on Binance spot limits:
//! - **REQUEST_WEIGHT**: 1_200 per minute
//! - **ORDERS**: 100 per 10 seconds
//!
//! Reference: https://binance-docs.github.io/apidocs/spot/en/#limits

use std::time::Duration;

use crate::RateLimitStrategy;
use crate::ServiceLimitConfig;

/// Account and market REST endpoints
///
/// 1_200 requests per minute on a sliding window, so a burst at the end of
/// one minute cannot be followed by a full burst at the start of the next.
pub fn rest_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(1_200, Duration::from_secs(60), RateLimitStrategy::SlidingWindow)
        .with_backoff(2.0, Duration::from_secs(60))
}

/// Conservative REST limits (66% of the published quota)
pub fn rest_limits_conservative() -> ServiceLimitConfig {
    ServiceLimitConfig::new(800, Duration::from_secs(60), RateLimitStrategy::SlidingWindow)
        .with_backoff(2.0, Duration::from_secs(60))
}

/// Order placement: 100 orders per 10 seconds
pub fn order_limits() -> ServiceLimitConfig {
    ServiceLimitConfig::new(100, Duration::from_secs(10), RateLimitStrategy::FixedWindow)
        .with_backoff(1.5, Duration::from_secs(10))
}

/// Weight-style quota refilled smoothly, with bursts up to `burst`
pub fn custom_weight_limit(weight_per_minute: u32, burst: u32) -> ServiceLimitConfig {
    ServiceLimitConfig::new(weight_per_minute, Duration::from_secs(60), RateLimitStrategy::TokenBucket).with_burst_limit(burst)
}
