use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use tracing::info;
use tracing::warn;

use crate::config::MisconfigPolicy;
use crate::config::RateLimitStrategy;
use crate::config::ServiceLimitConfig;
use crate::error::RateLimitError;
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::services;
use crate::stats::RateLimiterStats;

/// Per-service observability snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStats {
    pub strategy: RateLimitStrategy,
    pub max_requests: u32,
    pub time_window: Duration,
    pub requests: RateLimiterStats,

    /// Rejections since the last admission through `check`/`wait`
    pub consecutive_rejections: u32,

    /// True while the service is in a rejection streak
    pub backing_off: bool,
}

/// One configured external service
#[derive(Debug)]
struct Tier {
    limiter: RateLimiter,
    config: ServiceLimitConfig,
    consecutive_rejections: AtomicU32,
}

impl Tier {
    fn from_config(config: ServiceLimitConfig, policy: MisconfigPolicy) -> Result<Self> {
        let limiter = RateLimiter::from_config(&config, policy)?;
        Ok(Self { limiter, config, consecutive_rejections: AtomicU32::new(0) })
    }

    fn from_limiter(limiter: RateLimiter) -> Self {
        let mut config = ServiceLimitConfig::new(limiter.max_requests(), limiter.time_window(), limiter.strategy());
        if matches!(limiter.strategy(), RateLimitStrategy::TokenBucket | RateLimitStrategy::LeakyBucket) && limiter.capacity() != limiter.max_requests() {
            config = config.with_burst_limit(limiter.capacity());
        }
        Self { limiter, config, consecutive_rejections: AtomicU32::new(0) }
    }

    #[inline]
    fn record(&self, admitted: bool) {
        if admitted {
            self.consecutive_rejections.store(0, Ordering::Relaxed);
        } else {
            self.consecutive_rejections.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn backoff_delay(&self, identifier: &str) -> Duration {
        let streak = self.consecutive_rejections.load(Ordering::Relaxed);
        if streak == 0 {
            return Duration::ZERO;
        }

        let base = self.limiter.retry_after(identifier).as_secs_f64();
        let exponent = (streak - 1).min(64) as i32;
        let secs = (base * self.config.backoff_factor.powi(exponent)).min(self.config.max_backoff().as_secs_f64());

        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    fn stats(&self) -> ServiceStats {
        let consecutive_rejections = self.consecutive_rejections.load(Ordering::Relaxed);
        ServiceStats {
            strategy: self.limiter.strategy(),
            max_requests: self.limiter.max_requests(),
            time_window: self.limiter.time_window(),
            requests: self.limiter.stats(),
            consecutive_rejections,
            backing_off: consecutive_rejections > 0,
        }
    }
}

/// Rate limiters for several independently limited external services
///
/// Each service ("tier") such as an exchange REST API, a market data
/// provider, or an AI provider gets its own [`RateLimiter`] configured with
/// that dependency's quota. Callers address a tier by name:
///
/// - `check(service, identifier)` admits or rejects without blocking
/// - `wait(service, identifier)` suspends until the tier admits
///
/// A name with no configured tier is resolved by the [`MisconfigPolicy`].
#[derive(Debug, Default)]
pub struct MultiTierRateLimiter {
    tiers: DashMap<String, Arc<Tier>>,
    policy: MisconfigPolicy,
}

impl MultiTierRateLimiter {
    pub fn builder() -> MultiTierRateLimiterBuilder {
        MultiTierRateLimiterBuilder::new()
    }

    /// Build from a set of named service configs
    pub fn from_configs<I, K>(configs: I, policy: MisconfigPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = (K, ServiceLimitConfig)>,
        K: Into<String>,
    {
        let mut builder = Self::builder().misconfig_policy(policy);
        for (service, config) in configs {
            builder = builder.with_service(service, config)?;
        }
        Ok(builder.build())
    }

    /// Build with the preset quotas from [`services::default_configs`]
    pub fn with_defaults() -> Result<Self> {
        Self::from_configs(services::default_configs(), MisconfigPolicy::default())
    }

    /// Clone the tier out so no map lock is held across an await
    #[inline]
    fn tier(&self, service: &str) -> Option<Arc<Tier>> {
        self.tiers.get(service).map(|tier| Arc::clone(tier.value()))
    }

    /// Admit or reject one request to `service` for `identifier` without blocking
    pub fn check(&self, service: &str, identifier: &str) -> bool {
        match self.tier(service) {
            Some(tier) => {
                let admitted = tier.limiter.check(identifier);
                tier.record(admitted);
                admitted
            }
            None => match self.policy {
                MisconfigPolicy::FailOpen => {
                    warn!(service = %service, "No rate limit configured for service, admitting");
                    true
                }
                MisconfigPolicy::FailClosed => {
                    warn!(service = %service, "No rate limit configured for service, rejecting");
                    false
                }
            },
        }
    }

    /// Suspend until `service` admits a request for `identifier`
    pub async fn wait(&self, service: &str, identifier: &str) -> Result<()> {
        let Some(tier) = self.tier(service) else {
            return self.unknown_service(service);
        };

        tier.limiter.wait_if_needed(identifier).await;
        tier.record(true);
        Ok(())
    }

    /// Like [`MultiTierRateLimiter::wait`] but gives up after `max_wait`
    pub async fn wait_timeout(&self, service: &str, identifier: &str, max_wait: Duration) -> Result<()> {
        let Some(tier) = self.tier(service) else {
            return self.unknown_service(service);
        };

        let result = tier.limiter.wait_timeout(identifier, max_wait).await;
        tier.record(result.is_ok());
        result
    }

    fn unknown_service(&self, service: &str) -> Result<()> {
        match self.policy {
            MisconfigPolicy::FailOpen => {
                warn!(service = %service, "No rate limit configured for service, admitting");
                Ok(())
            }
            MisconfigPolicy::FailClosed => Err(RateLimitError::UnknownService(service.to_string())),
        }
    }

    /// Time until `service` would next admit `identifier`, zero for unknown services
    pub fn retry_after(&self, service: &str, identifier: &str) -> Duration {
        self.tier(service).map(|tier| tier.limiter.retry_after(identifier)).unwrap_or(Duration::ZERO)
    }

    /// Suggested delay for a caller that keeps hitting a rejected service
    ///
    /// Grows as `retry_after × backoff_factor^(streak − 1)`, capped at the
    /// tier's `max_backoff`. Zero once any request is admitted again.
    pub fn backoff_delay(&self, service: &str, identifier: &str) -> Duration {
        self.tier(service).map(|tier| tier.backoff_delay(identifier)).unwrap_or(Duration::ZERO)
    }

    pub fn is_backing_off(&self, service: &str) -> bool {
        self.tier(service).is_some_and(|tier| tier.consecutive_rejections.load(Ordering::Relaxed) > 0)
    }

    /// Replace (or add) the quota for `service`
    ///
    /// Waiters already suspended on the old tier finish against it.
    pub fn configure(&self, service: &str, config: ServiceLimitConfig) -> Result<()> {
        let tier = Tier::from_config(config, self.policy)?;
        info!(
            service = %service,
            strategy = %tier.limiter.strategy(),
            max_requests = tier.limiter.max_requests(),
            window_secs = tier.limiter.time_window().as_secs_f64(),
            "Configured rate limit tier"
        );
        self.tiers.insert(service.to_string(), Arc::new(tier));
        Ok(())
    }

    /// Drop the tier for `service`
    pub fn remove(&self, service: &str) -> bool {
        self.tiers.remove(service).is_some()
    }

    pub fn contains(&self, service: &str) -> bool {
        self.tiers.contains_key(service)
    }

    /// Configured service names, sorted
    pub fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self.tiers.iter().map(|entry| entry.key().clone()).collect();
        services.sort();
        services
    }

    /// The config a tier was built from
    pub fn config(&self, service: &str) -> Option<ServiceLimitConfig> {
        self.tier(service).map(|tier| tier.config.clone())
    }

    pub fn all_stats(&self) -> BTreeMap<String, ServiceStats> {
        self.tiers.iter().map(|entry| (entry.key().clone(), entry.value().stats())).collect()
    }

    pub fn reset_stats(&self) {
        for entry in self.tiers.iter() {
            entry.value().limiter.reset_stats();
        }
    }

    pub fn policy(&self) -> MisconfigPolicy {
        self.policy
    }
}

/// Builder for creating a multi-tier limiter
#[derive(Debug, Default)]
pub struct MultiTierRateLimiterBuilder {
    tiers: Vec<(String, Tier)>,
    policy: MisconfigPolicy,
}

impl MultiTierRateLimiterBuilder {
    pub fn new() -> Self {
        Self { tiers: Vec::new(), policy: MisconfigPolicy::default() }
    }

    /// Set the policy for unknown strategies and service names
    ///
    /// Applies to tiers added after this call.
    pub fn misconfig_policy(mut self, policy: MisconfigPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add a tier from its config
    pub fn with_service(mut self, service: impl Into<String>, config: ServiceLimitConfig) -> Result<Self> {
        let tier = Tier::from_config(config, self.policy)?;
        self.tiers.push((service.into(), tier));
        Ok(self)
    }

    /// Add a tier around an already built limiter
    pub fn with_limiter(mut self, service: impl Into<String>, limiter: RateLimiter) -> Self {
        self.tiers.push((service.into(), Tier::from_limiter(limiter)));
        self
    }

    pub fn build(self) -> MultiTierRateLimiter {
        let tiers = DashMap::new();
        for (service, tier) in self.tiers {
            tiers.insert(service, Arc::new(tier));
        }
        MultiTierRateLimiter { tiers, policy: self.policy }
    }
}
