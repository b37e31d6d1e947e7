use std::time::Duration;

use mm_ratelimit::MultiTierRateLimiter;
use mm_ratelimit::RateLimitStrategy;
use mm_ratelimit::RateLimiter;
use mm_ratelimit::services;
use proptest::prelude::*;

const ALL_STRATEGIES: [RateLimitStrategy; 4] =
    [RateLimitStrategy::FixedWindow, RateLimitStrategy::SlidingWindow, RateLimitStrategy::TokenBucket, RateLimitStrategy::LeakyBucket];

#[test]
fn test_burst_of_five_admits_three_for_every_strategy() {
    for strategy in ALL_STRATEGIES {
        let limiter = RateLimiter::new(3, Duration::from_secs(1), strategy).unwrap();

        let admitted = (0..5).filter(|_| limiter.check("x")).count();

        assert_eq!(admitted, 3, "strategy {strategy}");
        assert_eq!(limiter.stats().blocked, 2, "strategy {strategy}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_sliding_window_replenishes_after_window() {
    let limiter = RateLimiter::new(3, Duration::from_secs(1), RateLimitStrategy::SlidingWindow).unwrap();
    for _ in 0..3 {
        assert!(limiter.check("x"));
    }
    assert!(!limiter.check("x"));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(limiter.check("x"));
}

#[tokio::test(start_paused = true)]
async fn test_token_bucket_never_exceeds_capacity_when_idle() {
    let limiter = RateLimiter::new(5, Duration::from_secs(1), RateLimitStrategy::TokenBucket).unwrap();
    assert!(limiter.check("x"));

    tokio::time::advance(Duration::from_secs(1000)).await;

    let tokens = limiter.tokens("x").unwrap();
    assert!(tokens <= 5.0, "tokens {tokens}");
    assert_eq!(limiter.available("x"), 5);
}

#[tokio::test(start_paused = true)]
async fn test_sleeping_retry_after_then_check_admits() {
    for strategy in ALL_STRATEGIES {
        let limiter = RateLimiter::new(3, Duration::from_secs(1), strategy).unwrap();
        while limiter.check("x") {}

        let wait = limiter.retry_after("x");
        assert!(wait > Duration::ZERO, "strategy {strategy}");

        tokio::time::sleep(wait).await;

        assert!(limiter.check("x"), "strategy {strategy} rejected after {wait:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_sliding_window() {
    let limiter = RateLimiter::new(2, Duration::from_secs(1), RateLimitStrategy::SlidingWindow).unwrap();

    assert!(limiter.check("x"));
    assert!(limiter.check("x"));
    assert!(!limiter.check("x"));

    let wait = limiter.retry_after("x");
    assert!(wait > Duration::ZERO && wait <= Duration::from_secs(1), "wait {wait:?}");

    tokio::time::sleep(wait).await;
    assert!(limiter.check("x"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waiters_are_all_eventually_admitted() {
    let limiter = std::sync::Arc::new(MultiTierRateLimiter::with_defaults().unwrap());
    let mut handles = vec![];

    for task in 0..30 {
        let limiter = std::sync::Arc::clone(&limiter);
        handles.push(tokio::spawn(async move {
            limiter.wait(services::MARKET_DATA, "BTCUSDT").await.unwrap();
            task
        }));
    }

    let mut finished = 0;
    for handle in handles {
        handle.await.unwrap();
        finished += 1;
    }

    assert_eq!(finished, 30);
    assert_eq!(limiter.all_stats()[services::MARKET_DATA].requests.allowed, 30);
}

proptest! {
    #[test]
    fn test_immediate_checks_admit_min_of_requests_and_quota(
        max_requests in 1u32..20,
        attempts in 0usize..50,
        strategy_index in 0usize..4,
    ) {
        let strategy = ALL_STRATEGIES[strategy_index];
        let limiter = RateLimiter::new(max_requests, Duration::from_secs(3600), strategy).unwrap();

        let admitted = (0..attempts).filter(|_| limiter.check("x")).count();

        prop_assert_eq!(admitted, attempts.min(max_requests as usize));
        prop_assert_eq!(limiter.available("x") as usize, max_requests as usize - admitted);
        prop_assert_eq!(limiter.stats().total, attempts as u64);
    }

    #[test]
    fn test_retry_after_is_zero_until_quota_is_spent(max_requests in 1u32..20, strategy_index in 0usize..4) {
        let strategy = ALL_STRATEGIES[strategy_index];
        let limiter = RateLimiter::new(max_requests, Duration::from_secs(3600), strategy).unwrap();

        for _ in 0..max_requests {
            prop_assert_eq!(limiter.retry_after("x"), Duration::ZERO);
            prop_assert!(limiter.check("x"));
        }
        prop_assert!(limiter.retry_after("x") > Duration::ZERO);
    }
}
