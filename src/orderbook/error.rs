use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orderbook::types::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum OrderBookError {
    /// Capacity or tolerance settings are unusable
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Initial snapshot does not carry enough levels for one side
    #[error("Invalid snapshot: {side} side has {actual} levels, {required} required")]
    InvalidSnapshot {
        side: Side,
        required: usize,
        actual: usize,
    },

    /// Book has not been seeded with a snapshot yet
    #[error("Order book not initialized")]
    NotInitialized,

    /// Price or amount is NaN or infinite
    #[error("Invalid {side} level: price {price}, amount {amount}")]
    InvalidLevel { side: Side, price: f64, amount: f64 },

    /// Batch is older than the last applied one
    #[error("Out of order event: last {last}, received {received}")]
    OutOfOrderEvent { last: i64, received: i64 },
}

/// Result type for order book operations
pub type OrderBookResult<T> = Result<T, OrderBookError>;
