//! Settlement Benchmarks — Payout Computation Performance
//!
//! Benchmarks the pure settlement arithmetic that runs under the ledger
//! lock on every tick. Keeping this fast keeps the lock hold time short.
//!
//! Run with: cargo bench --bench settlement_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use coinpredict::domain::bet::{Bet, Direction};
use coinpredict::domain::settlement::{Outcome, outcome, payouts};

fn sample_bets(n: i64) -> Vec<Bet> {
    (0..n)
        .map(|i| Bet {
            id: i + 1,
            user_id: i + 1,
            market_id: 1,
            direction: if i % 2 == 0 {
                Direction::Up
            } else {
                Direction::Down
            },
            amount: 50 + (i % 100),
            resolved: false,
        })
        .collect()
}

/// Benchmark outcome classification.
fn bench_outcome(c: &mut Criterion) {
    c.bench_function("outcome_classification", |b| {
        b.iter(|| outcome(black_box(50_000.0), black_box(50_500.0), black_box(0.01)));
    });
}

/// Benchmark payout computation for a busy market.
fn bench_payouts(c: &mut Criterion) {
    let bets = sample_bets(1_000);

    c.bench_function("payouts_1000_bets", |b| {
        b.iter(|| payouts(black_box(&bets), Outcome::Winner(Direction::Up), 2));
    });

    c.bench_function("payouts_1000_bets_tie", |b| {
        b.iter(|| payouts(black_box(&bets), Outcome::Tie, 2));
    });
}

criterion_group!(benches, bench_outcome, bench_payouts);
criterion_main!(benches);
