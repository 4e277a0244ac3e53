//! Bounded Top-of-Book Depth Engine
//!
//! Maintains a fixed-depth view of a two-sided limit order book for a single
//! instrument from a stream of depth updates, with cheap best bid / best ask
//! queries and tolerance for floating-point noise in prices and amounts.
//!
//! # Features
//!
//! - **Bounded Depth**: Each side keeps at most `max_levels` price levels; a
//!   new level at full capacity evicts the worst one or is dropped
//! - **Cached Best Price**: Best level tracked by slot, rescanned only when it
//!   is removed
//! - **Epsilon Tolerance**: Prices within `price_epsilon` are one level, amounts
//!   below `amount_epsilon` delete the level
//! - **Replay Tooling**: Log-line feed adapter, file replay driver and metrics
//!
//! # Quick Start
//!
//! ```rust
//! use orderbook_depth_engine::{BookConfig, OrderBook, PriceLevel, UpdateBatch};
//!
//! let mut book = OrderBook::new(BookConfig::new(2, 0.001, 0.0001))?;
//!
//! // Seed the book from a full snapshot
//! let snapshot = UpdateBatch::new(
//!     vec![PriceLevel::new(100.00, 1.0), PriceLevel::new(99.99, 2.0)],
//!     vec![PriceLevel::new(100.01, 1.5), PriceLevel::new(100.02, 0.5)],
//!     1000,
//! );
//! book.init_levels(&snapshot)?;
//!
//! // Remove the best bid
//! book.apply(&UpdateBatch::new(vec![PriceLevel::new(100.00, 0.0)], vec![], 1001))?;
//!
//! assert_eq!(book.best_bid(), Some(PriceLevel::new(99.99, 2.0)));
//! assert_eq!(book.top_of_book().to_string(), "1001 99.990000 2.000000 100.010000 1.500000");
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! Each side is a [`LevelSet`]: a flat, capacity-bounded buffer of levels
//! scanned linearly. At the depths this engine targets (tens to a few hundred
//! levels) a scan beats a tree or hash index on cache locality, and no update
//! allocates.

pub mod config;
pub mod feed;
pub mod metrics;
pub mod orderbook;
pub mod publish;
pub mod replay;
pub mod utils;

// Re-export commonly used types
pub use config::{BookConfig, ErrorPolicy, ReplayConfig};
pub use feed::{FeedError, FeedParser};
pub use orderbook::{
    error::{OrderBookError, OrderBookResult},
    types::{EventTime, LevelChange, Price, PriceLevel, Side, TopOfBook, UpdateBatch},
    ApplySummary, LevelSet, OrderBook,
};
pub use replay::{ReplayDriver, ReplaySummary};

pub use crate::metrics::OrderBookMetrics;
