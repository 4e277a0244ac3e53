//! Core order book implementation module
//!
//! Fixed-depth price ladders for both sides of one instrument, with a cached
//! best level per side and tolerance-based price and amount comparisons.

pub mod book;
pub mod error;
pub mod level_set;
pub mod price_level;
pub mod types;

// Re-export main types for convenience
pub use book::{ApplySummary, OrderBook, OrderBookStats};
pub use error::{OrderBookError, OrderBookResult};
pub use level_set::LevelSet;
pub use price_level::Tolerance;
pub use types::{
    Amount, EventTime, LevelChange, Price, PriceLevel, Side, TopOfBook, UpdateBatch,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookConfig;

    #[test]
    fn test_module_exports() {
        // Test that all main types are accessible
        let _book = OrderBook::new(BookConfig::default()).unwrap();
        let _level = PriceLevel::new(100.0, 1.0);
        let _batch = UpdateBatch::default();
        let _error = OrderBookError::NotInitialized;
    }
}
