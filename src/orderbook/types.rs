use serde::{Deserialize, Serialize};
use std::fmt;

pub type Price = f64;
pub type Amount = f64;
pub type EventTime = i64; // Exchange event time, milliseconds since epoch

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns true when `a` ranks ahead of `b` on this side.
    /// Bids prefer the higher price, asks the lower one.
    #[inline]
    pub fn is_better(self, a: Price, b: Price) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// A resting price and amount on one side of the book
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub amount: Amount,
}

impl PriceLevel {
    pub fn new(price: Price, amount: Amount) -> Self {
        Self { price, amount }
    }

    pub fn is_finite(&self) -> bool {
        self.price.is_finite() && self.amount.is_finite()
    }
}

impl From<(Price, Amount)> for PriceLevel {
    fn from((price, amount): (Price, Amount)) -> Self {
        Self::new(price, amount)
    }
}

/// One depth record: a full snapshot for the first record, incremental changes afterwards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateBatch {
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
    pub event_time: EventTime,
}

impl UpdateBatch {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>, event_time: EventTime) -> Self {
        Self {
            asks,
            bids,
            event_time,
        }
    }

    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }
}

/// Best bid / best ask at a given event time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TopOfBook {
    pub event_time: EventTime,
    pub best_bid: Option<PriceLevel>,
    pub best_ask: Option<PriceLevel>,
}

// Renders `eventTime bidPrice bidAmount askPrice askAmount` with six decimals.
impl fmt::Display for TopOfBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bid = self.best_bid.unwrap_or_default();
        let ask = self.best_ask.unwrap_or_default();
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.event_time, bid.price, bid.amount, ask.price, ask.amount
        )
    }
}

/// Effect of a single level update on one side of the book
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelChange {
    /// New price appended to the active set
    Inserted,
    /// Amount overwritten at an existing price
    Updated,
    /// Existing price removed by an empty amount
    Removed(PriceLevel),
    /// New price inserted at full capacity, pushing out the worst level
    Evicted(PriceLevel),
    /// New price ranked below every active level at full capacity and was discarded
    Dropped,
    /// Empty amount for a price that is not active
    Ignored,
}
