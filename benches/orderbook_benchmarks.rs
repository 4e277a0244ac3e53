//! Benchmarks for `OrderBook` updates using criterion.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use orderbook_depth_engine::{BookConfig, FeedParser, OrderBook, PriceLevel, UpdateBatch};

const LEVELS: usize = 20;

fn snapshot() -> UpdateBatch {
    UpdateBatch::new(
        (0..LEVELS)
            .map(|i| PriceLevel::new(50_000.0 - i as f64 * 0.5, 1.0 + i as f64))
            .collect(),
        (0..LEVELS)
            .map(|i| PriceLevel::new(50_000.5 + i as f64 * 0.5, 1.0 + i as f64))
            .collect(),
        0,
    )
}

/// Deterministic mix of amount changes, deletions and new levels near the top
fn updates(count: usize) -> Vec<UpdateBatch> {
    (0..count)
        .map(|n| {
            let offset = (n % 30) as f64 * 0.5;
            let amount = if n % 7 == 0 { 0.0 } else { (n % 13) as f64 + 0.25 };
            UpdateBatch::new(
                vec![
                    PriceLevel::new(50_000.0 - offset, amount),
                    PriceLevel::new(50_000.0 - (offset + 1.0), 2.0),
                ],
                vec![
                    PriceLevel::new(50_000.5 + offset, amount),
                    PriceLevel::new(50_000.5 + offset + 1.0, 3.0),
                ],
                n as i64 + 1,
            )
        })
        .collect()
}

fn seeded_book() -> OrderBook {
    let mut book = OrderBook::new(BookConfig::new(LEVELS, 1e-6, 1e-9)).unwrap();
    book.init_levels(&snapshot()).unwrap();
    book
}

fn bench_full_replay(c: &mut Criterion) {
    let batches = updates(80_000);

    c.bench_function("full_replay_80k", |b| {
        b.iter_batched(
            seeded_book,
            |mut book| {
                for batch in &batches {
                    book.apply(batch).unwrap();
                }
                black_box(book.top_of_book())
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_single_update(c: &mut Criterion) {
    let batches = updates(1_000);
    let mut book = seeded_book();
    let mut index = 0;

    c.bench_function("single_update", |b| {
        b.iter(|| {
            book.apply(black_box(&batches[index])).unwrap();
            index = (index + 1) % batches.len();
            black_box(book.best_bid())
        })
    });
}

fn bench_parse_line(c: &mut Criterion) {
    let parser = FeedParser::new();
    let line = r#"2021-09-01 12:00:00.123 Get Object: {"event_time": 1630497600123, "asks": [[50000.5, 1.5], [50001.0, 0.5]], "bids": [[50000.0, 1.0], [49999.5, 2.0]]}"#;

    c.bench_function("parse_line", |b| {
        b.iter(|| black_box(parser.parse_line(black_box(line)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_full_replay,
    bench_single_update,
    bench_parse_line
);
criterion_main!(benches);
