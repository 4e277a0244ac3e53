use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::orderbook::{ApplySummary, OrderBook, Side};

pub mod collectors;

/// Metrics collector for order book updates
#[derive(Debug)]
pub struct OrderBookMetrics {
    // Latency tracking
    apply_latency: LatencyTracker,

    // Throughput counters
    batches_applied: AtomicU64,
    batches_rejected: AtomicU64,
    levels_inserted: AtomicU64,
    levels_updated: AtomicU64,
    levels_removed: AtomicU64,
    levels_evicted: AtomicU64,
    levels_dropped: AtomicU64,
    levels_ignored: AtomicU64,
}

impl OrderBookMetrics {
    pub fn new() -> Self {
        // Register metric descriptions
        describe_counter!("orderbook_batches_total", "Depth batches processed");
        describe_counter!("orderbook_level_changes_total", "Level changes by kind");
        describe_histogram!(
            "orderbook_apply_duration_seconds",
            "Duration of applying one depth batch"
        );
        describe_gauge!("orderbook_levels_total", "Active price levels per side");
        describe_gauge!("orderbook_best_price", "Best price per side");
        describe_gauge!("orderbook_spread", "Best ask minus best bid");

        Self {
            apply_latency: LatencyTracker::new("apply"),
            batches_applied: AtomicU64::new(0),
            batches_rejected: AtomicU64::new(0),
            levels_inserted: AtomicU64::new(0),
            levels_updated: AtomicU64::new(0),
            levels_removed: AtomicU64::new(0),
            levels_evicted: AtomicU64::new(0),
            levels_dropped: AtomicU64::new(0),
            levels_ignored: AtomicU64::new(0),
        }
    }

    pub fn record_latency(&self, duration: Duration) {
        self.apply_latency.record_latency(duration);
    }

    // Counter methods
    pub fn record_applied(&self, summary: &ApplySummary) {
        self.batches_applied.fetch_add(1, Ordering::Relaxed);
        counter!("orderbook_batches_total", "result" => "applied").increment(1);

        let changes = [
            ("inserted", &self.levels_inserted, summary.inserted),
            ("updated", &self.levels_updated, summary.updated),
            ("removed", &self.levels_removed, summary.removed),
            ("evicted", &self.levels_evicted, summary.evicted),
            ("dropped", &self.levels_dropped, summary.dropped),
            ("ignored", &self.levels_ignored, summary.ignored),
        ];
        for (kind, total, count) in changes {
            if count > 0 {
                total.fetch_add(count, Ordering::Relaxed);
                counter!("orderbook_level_changes_total", "kind" => kind).increment(count);
            }
        }
    }

    pub fn record_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
        counter!("orderbook_batches_total", "result" => "rejected").increment(1);
    }

    // Gauge methods
    pub fn observe_book(&self, book: &OrderBook) {
        gauge!("orderbook_levels_total", "side" => "bid")
            .set(book.side(Side::Bid).count() as f64);
        gauge!("orderbook_levels_total", "side" => "ask")
            .set(book.side(Side::Ask).count() as f64);

        if let Some(bid) = book.best_bid() {
            gauge!("orderbook_best_price", "side" => "bid").set(bid.price);
        }
        if let Some(ask) = book.best_ask() {
            gauge!("orderbook_best_price", "side" => "ask").set(ask.price);
        }
        if let Some(spread) = book.spread() {
            gauge!("orderbook_spread").set(spread);
        }
    }

    // Getters for current values
    pub fn get_batches_applied(&self) -> u64 {
        self.batches_applied.load(Ordering::Relaxed)
    }

    pub fn get_batches_rejected(&self) -> u64 {
        self.batches_rejected.load(Ordering::Relaxed)
    }

    pub fn get_levels_evicted(&self) -> u64 {
        self.levels_evicted.load(Ordering::Relaxed)
    }

    pub fn get_levels_dropped(&self) -> u64 {
        self.levels_dropped.load(Ordering::Relaxed)
    }

    /// All level changes recorded so far
    pub fn get_change_totals(&self) -> ApplySummary {
        ApplySummary {
            inserted: self.levels_inserted.load(Ordering::Relaxed),
            updated: self.levels_updated.load(Ordering::Relaxed),
            removed: self.levels_removed.load(Ordering::Relaxed),
            evicted: self.levels_evicted.load(Ordering::Relaxed),
            dropped: self.levels_dropped.load(Ordering::Relaxed),
            ignored: self.levels_ignored.load(Ordering::Relaxed),
        }
    }

    pub fn get_latency_stats(&self) -> OperationLatencyStats {
        self.apply_latency.get_stats()
    }
}

impl Default for OrderBookMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency tracker for individual operations
#[derive(Debug)]
struct LatencyTracker {
    operation: &'static str,
    samples: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl LatencyTracker {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            samples: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    fn record_latency(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;

        self.samples.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);

        // Record in metrics system
        histogram!("orderbook_apply_duration_seconds", "operation" => self.operation)
            .record(duration.as_secs_f64());
    }

    fn get_stats(&self) -> OperationLatencyStats {
        let samples = self.samples.load(Ordering::Relaxed);
        let total = self.total_nanos.load(Ordering::Relaxed);
        let min = self.min_nanos.load(Ordering::Relaxed);
        let max = self.max_nanos.load(Ordering::Relaxed);

        let avg = if samples > 0 { total / samples } else { 0 };

        OperationLatencyStats {
            operation: self.operation.to_string(),
            samples,
            avg_nanos: avg,
            min_nanos: if min == u64::MAX { 0 } else { min },
            max_nanos: max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationLatencyStats {
    pub operation: String,
    pub samples: u64,
    pub avg_nanos: u64,
    pub min_nanos: u64,
    pub max_nanos: u64,
}

impl OperationLatencyStats {
    pub fn avg_micros(&self) -> f64 {
        self.avg_nanos as f64 / 1_000.0
    }

    pub fn min_micros(&self) -> f64 {
        self.min_nanos as f64 / 1_000.0
    }

    pub fn max_micros(&self) -> f64 {
        self.max_nanos as f64 / 1_000.0
    }
}
