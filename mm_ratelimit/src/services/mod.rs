//! Pre-configured quotas for the external services the platform calls
//!
//! Each submodule returns [`ServiceLimitConfig`]s matching (or sitting just
//! under) the provider's published limits, ready to feed into a
//! [`MultiTierRateLimiter`](crate::MultiTierRateLimiter).
//!
//! # Services
//!
//! - **exchange**: order placement and account REST endpoints
//! - **market_data**: candles, tickers, and order book snapshots
//! - **ai_provider**: LLM completion endpoints used for signal scoring
//! - **news_api**: headline feeds with small daily quotas

use std::collections::BTreeMap;

use crate::ServiceLimitConfig;

pub mod ai_provider;
pub mod exchange;
pub mod market_data;

pub const EXCHANGE: &str = "exchange";
pub const MARKET_DATA: &str = "market_data";
pub const AI_PROVIDER: &str = "ai_provider";
pub const NEWS_API: &str = "news_api";

/// Default tier set used when no configuration file is supplied
pub fn default_configs() -> BTreeMap<String, ServiceLimitConfig> {
    BTreeMap::from([
        (EXCHANGE.to_string(), exchange::rest_limits()),
        (MARKET_DATA.to_string(), market_data::default_limits()),
        (AI_PROVIDER.to_string(), ai_provider::default_limits()),
        (NEWS_API.to_string(), market_data::news_limits()),
    ])
}
