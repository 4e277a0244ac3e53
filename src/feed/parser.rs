use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::orderbook::types::{EventTime, PriceLevel, UpdateBatch};

/// Text preceding the JSON payload in a depth log line
pub const PAYLOAD_MARKER: &str = "Get Object: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Payload was found but is not a valid depth record
    #[error("Malformed depth payload: {reason}")]
    Decode { reason: String },
}

pub type FeedResult<T> = Result<T, FeedError>;

#[derive(Debug, Deserialize)]
struct RawDepth {
    #[serde(default)]
    asks: Vec<Vec<RawNumber>>,
    #[serde(default)]
    bids: Vec<Vec<RawNumber>>,
    event_time: EventTime,
}

// Exchanges send levels either as JSON numbers or as decimal strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn to_f64(&self) -> FeedResult<f64> {
        match self {
            RawNumber::Number(value) => Ok(*value),
            RawNumber::Text(text) => text.trim().parse().map_err(|_| FeedError::Decode {
                reason: format!("invalid number {:?}", text),
            }),
        }
    }
}

/// Extracts depth batches from log lines of the form
/// `... Get Object: {"asks": [[p, a], ...], "bids": [...], "event_time": t} ...`
#[derive(Debug, Clone)]
pub struct FeedParser {
    marker: String,
}

impl FeedParser {
    pub fn new() -> Self {
        Self::with_marker(PAYLOAD_MARKER)
    }

    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Decode one line. Lines without a complete payload yield `Ok(None)`.
    pub fn parse_line(&self, line: &str) -> FeedResult<Option<UpdateBatch>> {
        let Some(payload) = self.extract_payload(line) else {
            trace!("No depth payload in line");
            return Ok(None);
        };
        Self::decode_payload(payload).map(Some)
    }

    /// Locate the first balanced `{...}` block after the marker.
    ///
    /// Braces are counted without regard to JSON strings; depth payloads
    /// carry only numbers and plain keys.
    pub fn extract_payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        let start = line.find(&self.marker)? + self.marker.len();
        let rest = line[start..].trim_start();
        if !rest.starts_with('{') {
            return None;
        }

        let mut depth = 0usize;
        for (index, byte) in rest.bytes().enumerate() {
            match byte {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&rest[..=index]);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Decode many lines on the rayon pool, preserving input order
    pub fn parse_lines_parallel(&self, lines: &[String]) -> Vec<FeedResult<Option<UpdateBatch>>> {
        lines.par_iter().map(|line| self.parse_line(line)).collect()
    }

    fn decode_payload(payload: &str) -> FeedResult<UpdateBatch> {
        let raw: RawDepth = serde_json::from_str(payload).map_err(|e| FeedError::Decode {
            reason: e.to_string(),
        })?;

        Ok(UpdateBatch {
            asks: Self::decode_levels(&raw.asks)?,
            bids: Self::decode_levels(&raw.bids)?,
            event_time: raw.event_time,
        })
    }

    fn decode_levels(raw: &[Vec<RawNumber>]) -> FeedResult<Vec<PriceLevel>> {
        raw.iter()
            .map(|entry| match entry.as_slice() {
                [price, amount, ..] => Ok(PriceLevel::new(price.to_f64()?, amount.to_f64()?)),
                _ => Err(FeedError::Decode {
                    reason: format!("level needs price and amount, got {} values", entry.len()),
                }),
            })
            .collect()
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}
