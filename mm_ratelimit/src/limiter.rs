use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tokio::time::Instant;
use tracing::debug;

use crate::config::MisconfigPolicy;
use crate::config::RateLimitStrategy;
use crate::config::ServiceLimitConfig;
use crate::error::RateLimitError;
use crate::error::Result;
use crate::fixed_window::FixedWindowState;
use crate::leaky_bucket::BucketState;
use crate::sliding_window::SlidingWindowState;
use crate::stats::RateLimiterStats;
use crate::stats::StatsCounters;
use crate::time::TimeSource;

/// Lower bound on a single wait step, keeps a racing waiter from spinning
const MIN_WAIT_STEP: Duration = Duration::from_millis(1);

/// Immutable quota parameters shared by every identifier of a limiter
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quota {
    pub max_requests: u32,
    pub window: Duration,

    /// Bucket capacity in tokens
    pub capacity: f64,

    /// Bucket refill rate in tokens per second
    pub refill_per_sec: f64,
}

impl Quota {
    pub fn new(max_requests: u32, window: Duration, burst_limit: Option<u32>) -> Self {
        Self {
            max_requests,
            window,
            capacity: f64::from(burst_limit.unwrap_or(max_requests)),
            refill_per_sec: f64::from(max_requests) / window.as_secs_f64(),
        }
    }

    /// Time for one whole token to regenerate
    pub fn token_interval(&self) -> Duration {
        self.window / self.max_requests
    }
}

/// Per-identifier admission state, one implementation per strategy
pub(crate) trait WindowState {
    /// Admit one request if quota allows, consuming it
    fn try_admit(&mut self, now: Instant, quota: &Quota) -> bool;

    /// How long until the next request would be admitted
    fn retry_after(&mut self, now: Instant, quota: &Quota) -> Duration;

    /// Whole requests that could be admitted right now
    fn available(&mut self, now: Instant, quota: &Quota) -> u32;
}

#[derive(Debug, Clone)]
enum IdentifierState {
    Fixed(FixedWindowState),
    Sliding(SlidingWindowState),
    Bucket(BucketState),
}

impl IdentifierState {
    fn new(strategy: RateLimitStrategy, now: Instant, quota: &Quota) -> Option<Self> {
        match strategy {
            RateLimitStrategy::FixedWindow => Some(IdentifierState::Fixed(FixedWindowState::new(now))),
            RateLimitStrategy::SlidingWindow => Some(IdentifierState::Sliding(SlidingWindowState::new())),
            RateLimitStrategy::TokenBucket | RateLimitStrategy::LeakyBucket => Some(IdentifierState::Bucket(BucketState::new(now, quota))),
            RateLimitStrategy::Permissive => None,
        }
    }

    fn as_window(&mut self) -> &mut dyn WindowState {
        match self {
            IdentifierState::Fixed(state) => state,
            IdentifierState::Sliding(state) => state,
            IdentifierState::Bucket(state) => state,
        }
    }
}

/// Rate limiter for one external resource, tracked per caller identifier
///
/// Each identifier (an API key, a symbol, a user id, ...) gets its own quota
/// state, created lazily on first use. Every check-then-mutate step runs under
/// that identifier's map entry lock, so the limiter is safe to share across
/// threads of a multi-threaded runtime.
///
/// `check` consumes quota when it admits. There is no side-effect-free peek:
/// `retry_after` and `available` also advance window and refill state.
#[derive(Debug)]
pub struct RateLimiter {
    strategy: RateLimitStrategy,
    quota: Quota,
    states: DashMap<String, IdentifierState>,
    stats: StatsCounters,
    time_source: TimeSource,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `time_window`
    pub fn new(max_requests: u32, time_window: Duration, strategy: RateLimitStrategy) -> Result<Self> {
        Self::with_burst(max_requests, time_window, strategy, None)
    }

    fn with_burst(max_requests: u32, time_window: Duration, strategy: RateLimitStrategy, burst_limit: Option<u32>) -> Result<Self> {
        if max_requests == 0 {
            return Err(RateLimitError::InvalidConfig("max_requests must be greater than 0".to_string()));
        }
        if time_window.is_zero() {
            return Err(RateLimitError::InvalidConfig("time_window must be greater than 0".to_string()));
        }
        if burst_limit == Some(0) {
            return Err(RateLimitError::InvalidConfig("burst_limit must be greater than 0".to_string()));
        }

        Ok(Self {
            strategy,
            quota: Quota::new(max_requests, time_window, burst_limit),
            states: DashMap::new(),
            stats: StatsCounters::new(),
            time_source: TimeSource,
        })
    }

    /// Create a limiter with a per-second quota
    pub fn per_second(max_requests: u32, strategy: RateLimitStrategy) -> Result<Self> {
        Self::new(max_requests, Duration::from_secs(1), strategy)
    }

    /// Create a limiter with a per-minute quota
    pub fn per_minute(max_requests: u32, strategy: RateLimitStrategy) -> Result<Self> {
        Self::new(max_requests, Duration::from_secs(60), strategy)
    }

    /// Create a limiter from a service config, resolving the strategy name under `policy`
    pub fn from_config(config: &ServiceLimitConfig, policy: MisconfigPolicy) -> Result<Self> {
        config.validate()?;
        let strategy = RateLimitStrategy::resolve(&config.strategy, policy)?;
        Self::with_burst(config.max_requests, config.time_window()?, strategy, config.burst_limit)
    }

    pub fn builder() -> RateLimiterBuilder {
        RateLimiterBuilder::new()
    }

    /// Get or lazily create the state for `identifier`, holding its entry lock
    #[inline]
    fn state(&self, identifier: &str, now: Instant) -> Option<RefMut<'_, String, IdentifierState>> {
        if let Some(state) = self.states.get_mut(identifier) {
            return Some(state);
        }
        let fresh = IdentifierState::new(self.strategy, now, &self.quota)?;
        Some(self.states.entry(identifier.to_string()).or_insert(fresh))
    }

    /// Admit or reject one request for `identifier` without blocking
    pub fn check(&self, identifier: &str) -> bool {
        let now = self.time_source.now();
        let admitted = match self.state(identifier, now) {
            Some(mut state) => state.as_window().try_admit(now, &self.quota),
            None => true,
        };

        self.stats.record(admitted);
        admitted
    }

    /// How long `identifier` should wait before its next request is admitted
    pub fn retry_after(&self, identifier: &str) -> Duration {
        let now = self.time_source.now();
        match self.states.get_mut(identifier) {
            Some(mut state) => state.as_window().retry_after(now, &self.quota),
            None => Duration::ZERO,
        }
    }

    /// Suspend until `identifier` is admitted
    ///
    /// Sleeps for the computed retry-after between attempts. Unbounded: wrap
    /// with [`RateLimiter::wait_timeout`] when the caller needs a deadline.
    pub async fn wait_if_needed(&self, identifier: &str) {
        while !self.check(identifier) {
            let delay = self.retry_after(identifier).max(MIN_WAIT_STEP);
            debug!(identifier = %identifier, delay_ms = delay.as_millis() as u64, "Rate limited, waiting");
            tokio::time::sleep(delay).await;
        }
    }

    /// Like [`RateLimiter::wait_if_needed`] but gives up after `max_wait`
    pub async fn wait_timeout(&self, identifier: &str, max_wait: Duration) -> Result<()> {
        tokio::time::timeout(max_wait, self.wait_if_needed(identifier)).await.map_err(|_| RateLimitError::Exceeded)
    }

    /// Whole requests `identifier` could make right now
    pub fn available(&self, identifier: &str) -> u32 {
        let now = self.time_source.now();
        match self.states.get_mut(identifier) {
            Some(mut state) => state.as_window().available(now, &self.quota),
            None => self.capacity(),
        }
    }

    /// Fractional token count for bucket strategies, `None` otherwise
    pub fn tokens(&self, identifier: &str) -> Option<f64> {
        let now = self.time_source.now();
        let mut state = self.states.get_mut(identifier)?;
        match &mut *state {
            IdentifierState::Bucket(bucket) => Some(bucket.tokens(now, &self.quota)),
            _ => None,
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Forget all quota state for `identifier`
    pub fn reset(&self, identifier: &str) {
        self.states.remove(identifier);
    }

    /// Forget quota state for every identifier
    pub fn reset_all(&self) {
        self.states.clear();
    }

    /// Number of identifiers with live state
    pub fn tracked_identifiers(&self) -> usize {
        self.states.len()
    }

    pub fn strategy(&self) -> RateLimitStrategy {
        self.strategy
    }

    pub fn max_requests(&self) -> u32 {
        self.quota.max_requests
    }

    pub fn time_window(&self) -> Duration {
        self.quota.window
    }

    /// Most requests that can be admitted back to back
    pub fn capacity(&self) -> u32 {
        match self.strategy {
            RateLimitStrategy::TokenBucket | RateLimitStrategy::LeakyBucket => self.quota.capacity as u32,
            RateLimitStrategy::Permissive => u32::MAX,
            RateLimitStrategy::FixedWindow | RateLimitStrategy::SlidingWindow => self.quota.max_requests,
        }
    }
}

/// Builder for configuring a rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterBuilder {
    max_requests: Option<u32>,
    window: Option<Duration>,
    strategy: RateLimitStrategy,
    burst_limit: Option<u32>,
}

impl RateLimiterBuilder {
    pub fn new() -> Self {
        Self { max_requests: None, window: None, strategy: RateLimitStrategy::SlidingWindow, burst_limit: None }
    }

    /// Set the limit (max requests per window)
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = Some(max_requests);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn per_second(mut self, max_requests: u32) -> Self {
        self.max_requests = Some(max_requests);
        self.window = Some(Duration::from_secs(1));
        self
    }

    pub fn per_minute(mut self, max_requests: u32) -> Self {
        self.max_requests = Some(max_requests);
        self.window = Some(Duration::from_secs(60));
        self
    }

    pub fn strategy(mut self, strategy: RateLimitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Bucket capacity for token/leaky bucket strategies
    pub fn burst_limit(mut self, burst_limit: u32) -> Self {
        self.burst_limit = Some(burst_limit);
        self
    }

    pub fn build(self) -> Result<RateLimiter> {
        let max_requests = self.max_requests.ok_or_else(|| RateLimitError::InvalidConfig("max_requests must be set".to_string()))?;
        let window = self.window.ok_or_else(|| RateLimitError::InvalidConfig("window must be set".to_string()))?;
        RateLimiter::with_burst(max_requests, window, self.strategy, self.burst_limit)
    }
}

impl Default for RateLimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const ALL_STRATEGIES: [RateLimitStrategy; 4] = [
        RateLimitStrategy::FixedWindow,
        RateLimitStrategy::SlidingWindow,
        RateLimitStrategy::TokenBucket,
        RateLimitStrategy::LeakyBucket,
    ];

    #[test]
    fn test_creation() {
        let limiter = RateLimiter::per_second(100, RateLimitStrategy::SlidingWindow).unwrap();
        assert_eq!(limiter.capacity(), 100);
        assert_eq!(limiter.available("anyone"), 100);
        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(RateLimiter::new(0, Duration::from_secs(1), RateLimitStrategy::FixedWindow), Err(RateLimitError::InvalidConfig(_))));
        assert!(matches!(RateLimiter::new(5, Duration::ZERO, RateLimitStrategy::TokenBucket), Err(RateLimitError::InvalidConfig(_))));
        assert!(RateLimiter::builder().per_second(5).burst_limit(0).build().is_err());
        assert!(RateLimiter::builder().window(Duration::from_secs(1)).build().is_err());
    }

    #[test]
    fn test_every_strategy_admits_exactly_max() {
        for strategy in ALL_STRATEGIES {
            let limiter = RateLimiter::new(3, Duration::from_secs(1), strategy).unwrap();

            let results: Vec<bool> = (0..5).map(|_| limiter.check("x")).collect();

            assert_eq!(results, vec![true, true, true, false, false], "strategy {strategy}");
            let stats = limiter.stats();
            assert_eq!((stats.allowed, stats.blocked, stats.total), (3, 2, 5), "strategy {strategy}");
        }
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = RateLimiter::per_second(1, RateLimitStrategy::FixedWindow).unwrap();

        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(limiter.check("bob"));
        assert_eq!(limiter.tracked_identifiers(), 2);
    }

    #[test]
    fn test_retry_after_non_negative_for_unknown_identifier() {
        let limiter = RateLimiter::per_second(1, RateLimitStrategy::SlidingWindow).unwrap();
        assert_eq!(limiter.retry_after("never-seen"), Duration::ZERO);
    }

    #[test]
    fn test_permissive_always_admits() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), RateLimitStrategy::Permissive).unwrap();

        for _ in 0..100 {
            assert!(limiter.check("x"));
        }
        assert_eq!(limiter.retry_after("x"), Duration::ZERO);
        assert_eq!(limiter.tracked_identifiers(), 0);
        assert_eq!(limiter.stats().allowed, 100);
    }

    #[test]
    fn test_from_config_fail_open_and_closed() {
        let config = ServiceLimitConfig { strategy: "gcra".to_string(), ..ServiceLimitConfig::default() };

        let open = RateLimiter::from_config(&config, MisconfigPolicy::FailOpen).unwrap();
        assert_eq!(open.strategy(), RateLimitStrategy::Permissive);

        let closed = RateLimiter::from_config(&config, MisconfigPolicy::FailClosed);
        assert!(matches!(closed, Err(RateLimitError::UnknownStrategy(_))));
    }

    #[test]
    fn test_from_config_burst_limit() {
        let config = ServiceLimitConfig::new(2, Duration::from_secs(1), RateLimitStrategy::TokenBucket).with_burst_limit(4);
        let limiter = RateLimiter::from_config(&config, MisconfigPolicy::FailClosed).unwrap();

        assert_eq!(limiter.capacity(), 4);
        let admitted = (0..6).filter(|_| limiter.check("x")).count();
        assert_eq!(admitted, 4);
    }

    #[test]
    fn test_reset_identifier() {
        let limiter = RateLimiter::per_minute(2, RateLimitStrategy::SlidingWindow).unwrap();

        assert!(limiter.check("x"));
        assert!(limiter.check("x"));
        assert!(!limiter.check("x"));

        limiter.reset("x");
        assert!(limiter.check("x"));

        limiter.reset_all();
        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[test]
    fn test_reset_stats() {
        let limiter = RateLimiter::per_second(1, RateLimitStrategy::FixedWindow).unwrap();
        limiter.check("x");
        limiter.check("x");

        limiter.reset_stats();
        assert_eq!(limiter.stats().total, 0);
        // Quota state survives a stats reset
        assert!(!limiter.check("x"));
    }

    #[test]
    fn test_tokens_only_for_buckets() {
        let bucket = RateLimiter::per_second(5, RateLimitStrategy::TokenBucket).unwrap();
        bucket.check("x");
        assert!(bucket.tokens("x").is_some());

        let window = RateLimiter::per_second(5, RateLimitStrategy::FixedWindow).unwrap();
        window.check("x");
        assert!(window.tokens("x").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_if_needed_sleeps_for_retry_after() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1), RateLimitStrategy::FixedWindow).unwrap();
        assert!(limiter.check("x"));
        assert!(limiter.check("x"));

        let start = Instant::now();
        limiter.wait_if_needed("x").await;

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(1) && waited < Duration::from_millis(1010), "waited {waited:?}");
        assert_eq!(limiter.available("x"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_gives_up() {
        let limiter = RateLimiter::per_minute(1, RateLimitStrategy::SlidingWindow).unwrap();
        assert!(limiter.check("x"));

        let result = limiter.wait_timeout("x", Duration::from_secs(5)).await;
        assert_eq!(result, Err(RateLimitError::Exceeded));

        let result = limiter.wait_timeout("x", Duration::from_secs(60)).await;
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_concurrent_access() {
        let limiter = Arc::new(RateLimiter::per_minute(1000, RateLimitStrategy::SlidingWindow).unwrap());
        let mut handles = vec![];

        for _ in 0..10 {
            let limiter_clone = Arc::clone(&limiter);
            handles.push(std::thread::spawn(move || (0..150).filter(|_| limiter_clone.check("shared")).count()));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 1000);
        assert_eq!(limiter.stats().blocked, 500);
    }
}
