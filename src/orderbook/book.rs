use std::io;
use tracing::{debug, info, warn};

use crate::config::BookConfig;
use crate::orderbook::error::{OrderBookError, OrderBookResult};
use crate::orderbook::level_set::LevelSet;
use crate::orderbook::types::{
    EventTime, LevelChange, Price, PriceLevel, Side, TopOfBook, UpdateBatch,
};

/// Bounded two-sided book for a single instrument
///
/// Holds one [`LevelSet`] per side and the event time of the last applied
/// batch. The book is seeded once with [`OrderBook::init_levels`] and then
/// driven by [`OrderBook::apply`].
#[derive(Debug, Clone)]
pub struct OrderBook {
    config: BookConfig,

    bids: LevelSet, // highest price is best
    asks: LevelSet, // lowest price is best

    event_time: EventTime,
    initialized: bool,

    // Statistics
    batches_applied: u64,
    totals: ApplySummary,
}

impl OrderBook {
    pub fn new(config: BookConfig) -> OrderBookResult<Self> {
        let tolerance = config.tolerance()?;
        info!(
            "Creating order book: {} levels, price eps {}, amount eps {}",
            config.max_levels, config.price_epsilon, config.amount_epsilon
        );

        Ok(Self {
            bids: LevelSet::new(Side::Bid, config.max_levels, tolerance)?,
            asks: LevelSet::new(Side::Ask, config.max_levels, tolerance)?,
            config,
            event_time: 0,
            initialized: false,
            batches_applied: 0,
            totals: ApplySummary::default(),
        })
    }

    /// Seed both sides from a full snapshot.
    ///
    /// Either both sides are replaced or nothing changes.
    pub fn init_levels(&mut self, snapshot: &UpdateBatch) -> OrderBookResult<()> {
        let tolerance = self.config.tolerance()?;
        let capacity = self.config.max_levels;

        let mut bids = LevelSet::new(Side::Bid, capacity, tolerance)?;
        let mut asks = LevelSet::new(Side::Ask, capacity, tolerance)?;
        bids.init(&snapshot.bids)?;
        asks.init(&snapshot.asks)?;

        self.bids = bids;
        self.asks = asks;
        self.event_time = snapshot.event_time;
        self.initialized = true;

        info!(
            "Order book initialized at {}: bid {:?} ask {:?}",
            self.event_time,
            self.bids.best(),
            self.asks.best()
        );
        Ok(())
    }

    /// Apply one incremental batch, asks first, then bids.
    ///
    /// A failing level aborts the batch; levels applied before it stay applied.
    pub fn apply(&mut self, batch: &UpdateBatch) -> OrderBookResult<ApplySummary> {
        if !self.initialized {
            return Err(OrderBookError::NotInitialized);
        }

        if self.config.enforce_monotonic_time && batch.event_time < self.event_time {
            warn!(
                last = self.event_time,
                received = batch.event_time,
                "out of order depth batch"
            );
            return Err(OrderBookError::OutOfOrderEvent {
                last: self.event_time,
                received: batch.event_time,
            });
        }

        let mut summary = ApplySummary::default();
        for level in &batch.asks {
            summary.record(self.asks.upsert(*level)?);
        }
        for level in &batch.bids {
            summary.record(self.bids.upsert(*level)?);
        }
        self.event_time = batch.event_time;

        self.batches_applied += 1;
        self.totals.merge(&summary);

        debug!(
            "Applied batch {} ({} asks, {} bids): {:?}",
            batch.event_time,
            batch.asks.len(),
            batch.bids.len(),
            summary
        );
        Ok(summary)
    }

    /// Apply a single level change to one side
    pub fn add_or_update(&mut self, side: Side, level: PriceLevel) -> OrderBookResult<LevelChange> {
        if !self.initialized {
            return Err(OrderBookError::NotInitialized);
        }

        let change = self.side_mut(side).upsert(level)?;
        self.totals.record(change);
        Ok(change)
    }

    pub fn add_bid(&mut self, level: PriceLevel) -> OrderBookResult<LevelChange> {
        self.add_or_update(Side::Bid, level)
    }

    pub fn add_ask(&mut self, level: PriceLevel) -> OrderBookResult<LevelChange> {
        self.add_or_update(Side::Ask, level)
    }

    /// Get current best bid
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best()
    }

    /// Get current best ask
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best()
    }

    pub fn event_time(&self) -> EventTime {
        self.event_time
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn side(&self, side: Side) -> &LevelSet {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Active levels of one side, best first
    pub fn depth(&self, side: Side) -> Vec<PriceLevel> {
        self.side(side).sorted_levels()
    }

    /// Best ask minus best bid
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / 2.0),
            _ => None,
        }
    }

    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            event_time: self.event_time,
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
        }
    }

    /// Write `eventTime bidPrice bidAmount askPrice askAmount` and a newline
    pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.top_of_book())
    }

    /// Get statistics
    pub fn get_stats(&self) -> OrderBookStats {
        OrderBookStats {
            event_time: self.event_time,
            bid_levels: self.bids.count(),
            ask_levels: self.asks.count(),
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            spread: self.spread(),
            batches_applied: self.batches_applied,
            dropped_bids: self.bids.dropped_count(),
            dropped_asks: self.asks.dropped_count(),
            totals: self.totals,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut LevelSet {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}

/// Tally of level changes produced by one or more batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub inserted: u64,
    pub updated: u64,
    pub removed: u64,
    pub evicted: u64,
    pub dropped: u64,
    pub ignored: u64,
}

impl ApplySummary {
    pub fn record(&mut self, change: LevelChange) {
        match change {
            LevelChange::Inserted => self.inserted += 1,
            LevelChange::Updated => self.updated += 1,
            LevelChange::Removed(_) => self.removed += 1,
            LevelChange::Evicted(_) => self.evicted += 1,
            LevelChange::Dropped => self.dropped += 1,
            LevelChange::Ignored => self.ignored += 1,
        }
    }

    pub fn merge(&mut self, other: &ApplySummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.removed += other.removed;
        self.evicted += other.evicted;
        self.dropped += other.dropped;
        self.ignored += other.ignored;
    }
}

#[derive(Debug, Clone)]
pub struct OrderBookStats {
    pub event_time: EventTime,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub best_bid: Option<PriceLevel>,
    pub best_ask: Option<PriceLevel>,
    pub spread: Option<Price>,
    pub batches_applied: u64,
    pub dropped_bids: u64,
    pub dropped_asks: u64,
    pub totals: ApplySummary,
}
