use crate::orderbook::error::{OrderBookError, OrderBookResult};
use crate::orderbook::types::{Amount, PriceLevel};

/// Equality tolerances shared by both sides of a book.
///
/// Prices and amounts arrive as decimal text converted to `f64`, so two
/// prices are the same level when they differ by less than `price_epsilon`,
/// and an amount below `amount_epsilon` means the level is no longer resting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    price_epsilon: f64,
    amount_epsilon: f64,
}

impl Tolerance {
    pub fn new(price_epsilon: f64, amount_epsilon: f64) -> OrderBookResult<Self> {
        if !(price_epsilon.is_finite() && price_epsilon > 0.0) {
            return Err(OrderBookError::Configuration(format!(
                "price_epsilon must be positive, got {}",
                price_epsilon
            )));
        }
        if !(amount_epsilon.is_finite() && amount_epsilon > 0.0) {
            return Err(OrderBookError::Configuration(format!(
                "amount_epsilon must be positive, got {}",
                amount_epsilon
            )));
        }

        Ok(Self {
            price_epsilon,
            amount_epsilon,
        })
    }

    pub fn price_epsilon(&self) -> f64 {
        self.price_epsilon
    }

    pub fn amount_epsilon(&self) -> f64 {
        self.amount_epsilon
    }

    /// Two levels sit at the same price
    #[inline]
    pub fn price_eq(&self, a: &PriceLevel, b: &PriceLevel) -> bool {
        (a.price - b.price).abs() < self.price_epsilon
    }

    /// Amount is small enough to count as a deletion
    #[inline]
    pub fn is_empty_amount(&self, amount: Amount) -> bool {
        amount.abs() < self.amount_epsilon
    }
}
