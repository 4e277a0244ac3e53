//! Top-of-book publication for concurrent readers
//!
//! The order book is owned by a single update loop. Readers on other threads
//! get a copy of the latest [`TopOfBook`] through a cloneable handle instead
//! of touching the book.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::orderbook::{OrderBook, TopOfBook};

#[derive(Debug, Clone, Default)]
pub struct TopOfBookPublisher {
    latest: Arc<RwLock<Option<TopOfBook>>>,
}

impl TopOfBookPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, top: TopOfBook) {
        *self.latest.write() = Some(top);
    }

    /// Copy the book's current top of book out to readers
    pub fn publish_from(&self, book: &OrderBook) {
        self.publish(book.top_of_book());
    }

    /// Latest published value, `None` before the first publish
    pub fn latest(&self) -> Option<TopOfBook> {
        *self.latest.read()
    }
}
