//! Depth feed adapter
//!
//! Turns raw log lines into [`UpdateBatch`](crate::orderbook::UpdateBatch)es.
//! The order book never sees raw text; it only consumes decoded batches.

pub mod parser;

pub use parser::{FeedError, FeedParser, FeedResult, PAYLOAD_MARKER};
