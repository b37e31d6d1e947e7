//! # mm_ratelimit
//!
//! Outbound rate limiting for external services.
//!
//! A [`RateLimiter`] enforces one quota per caller identifier using a fixed
//! window, sliding window, token bucket, or leaky bucket. A
//! [`MultiTierRateLimiter`] owns one limiter per named service.

pub mod config;
pub mod error;
mod fixed_window;
mod leaky_bucket;
pub mod limiter;
pub mod multi_limiter;
pub mod services;
mod sliding_window;
pub mod stats;
mod time;

pub use config::MisconfigPolicy;
pub use config::RateLimitStrategy;
pub use config::ServiceLimitConfig;
pub use error::RateLimitError;
pub use error::Result;
pub use limiter::RateLimiter;
pub use limiter::RateLimiterBuilder;
pub use multi_limiter::MultiTierRateLimiter;
pub use multi_limiter::MultiTierRateLimiterBuilder;
pub use multi_limiter::ServiceStats;
pub use stats::RateLimiterStats;
