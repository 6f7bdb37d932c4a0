//! Benchmarks for price ladder operations.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;

use binance_orderbook::types::messages::DepthUpdate;
use binance_orderbook::{PriceLadder, PriceLevel};

fn levels(count: i64, base: i64) -> Vec<PriceLevel> {
    (0..count)
        .map(|i| PriceLevel::new(Decimal::from(base + i), Decimal::from(100)))
        .collect()
}

fn populated(size: i64) -> PriceLadder {
    let mut ladder = PriceLadder::new();
    ladder.seed(1, &levels(size, 1_000), &levels(size, 10_000));
    ladder
}

fn bench_ladder_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("ladder_apply");

    for size in [10i64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut ladder = populated(size);

            // A typical update: one overwrite, one insert, one removal
            let update = DepthUpdate {
                first_update_id: Some(2),
                last_update_id: 2,
                bids: vec![
                    PriceLevel::new(Decimal::from(1_000), Decimal::from(50)),
                    PriceLevel::new(Decimal::from(999), Decimal::from(10)),
                    PriceLevel::new(Decimal::from(999), Decimal::ZERO),
                ],
                asks: vec![],
            };

            b.iter(|| {
                ladder.apply(black_box(&update));
            });
        });
    }

    group.finish();
}

fn bench_ladder_seed(c: &mut Criterion) {
    let mut group = c.benchmark_group("ladder_seed");

    for size in [10i64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let bids = levels(size, 1_000);
            let asks = levels(size, 10_000);
            let mut ladder = PriceLadder::new();

            b.iter(|| {
                ladder.seed(black_box(1), black_box(&bids), black_box(&asks));
            });
        });
    }

    group.finish();
}

fn bench_ladder_best_bid(c: &mut Criterion) {
    let mut group = c.benchmark_group("ladder_best_bid");

    for size in [10i64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let ladder = populated(size);

            b.iter(|| {
                black_box(ladder.best_bid());
            });
        });
    }

    group.finish();
}

fn bench_ladder_mid_price(c: &mut Criterion) {
    let ladder = populated(50);

    c.bench_function("ladder_mid_price", |b| {
        b.iter(|| {
            black_box(ladder.mid_price());
        });
    });
}

criterion_group!(
    benches,
    bench_ladder_apply,
    bench_ladder_seed,
    bench_ladder_best_bid,
    bench_ladder_mid_price
);
criterion_main!(benches);
