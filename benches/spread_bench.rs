//! Hot-path benchmark for the spread engine's O(|E|^2) pair scan, the
//! per-message cost the rest of the pipeline is built around hiding behind.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arbitrage_sniper::book::BookStore;
use arbitrage_sniper::spread::SpreadEngine;

fn book_with_exchanges(n: usize) -> BookStore {
    let mut book = BookStore::new(60_000);
    for i in 0..n {
        let exchange = format!("ex{i}");
        let price = 100.0 + i as f64 * 0.01;
        book.update(&exchange, "BTC/USDT", price, 1_000);
    }
    book
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("spread_engine_find");

    for &n in &[2usize, 4, 8, 16] {
        let book = book_with_exchanges(n);
        group.bench_function(format!("{n}_exchanges"), |b| {
            let mut engine = SpreadEngine::new(0.5);
            b.iter(|| black_box(engine.find("BTC/USDT", black_box(&book), 1_000)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find);
criterion_main!(benches);
