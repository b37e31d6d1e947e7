use std::hint::black_box;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use mm_ratelimit::MultiTierRateLimiter;
use mm_ratelimit::RateLimitStrategy;
use mm_ratelimit::RateLimiter;

const STRATEGIES: [RateLimitStrategy; 4] =
    [RateLimitStrategy::FixedWindow, RateLimitStrategy::SlidingWindow, RateLimitStrategy::TokenBucket, RateLimitStrategy::LeakyBucket];

fn bench_check_single_identifier(c: &mut Criterion) {
    for strategy in STRATEGIES {
        c.bench_function(&format!("check_single_{strategy}"), |b| {
            let limiter = RateLimiter::per_second(1_000_000, strategy).unwrap();
            b.iter(|| black_box(limiter.check(black_box("BTCUSDT"))));
        });
    }
}

fn bench_check_many_identifiers(c: &mut Criterion) {
    let symbols: Vec<String> = (0..256).map(|i| format!("SYM{i}")).collect();

    c.bench_function("check_many_sliding_window", |b| {
        let limiter = RateLimiter::per_second(1_000_000, RateLimitStrategy::SlidingWindow).unwrap();
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % symbols.len();
            black_box(limiter.check(black_box(&symbols[i])))
        });
    });
}

fn bench_multi_tier_check(c: &mut Criterion) {
    c.bench_function("multi_tier_check_defaults", |b| {
        let limiter = MultiTierRateLimiter::with_defaults().unwrap();
        b.iter(|| black_box(limiter.check(black_box("market_data"), black_box("BTCUSDT"))));
    });
}

criterion_group!(benches, bench_check_single_identifier, bench_check_many_identifiers, bench_multi_tier_check);
criterion_main!(benches);
