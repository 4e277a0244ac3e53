//! Engine and replay configuration
//!
//! Both structs deserialize from TOML with per-field defaults, so a config
//! file only needs the keys it overrides:
//!
//! ```toml
//! input = "data/huobi_global_depth.log"
//! output = "data/huobi_global_depth_answers.log"
//! on_error = "abort"
//!
//! [book]
//! max_levels = 20
//! price_epsilon = 0.000001
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::orderbook::error::{OrderBookError, OrderBookResult};
use crate::orderbook::price_level::Tolerance;

fn default_max_levels() -> usize {
    20
}

fn default_price_epsilon() -> f64 {
    1e-6
}

fn default_amount_epsilon() -> f64 {
    1e-9
}

/// Construction parameters for one order book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookConfig {
    /// Depth kept per side
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    /// Prices closer than this are the same level
    #[serde(default = "default_price_epsilon")]
    pub price_epsilon: f64,
    /// Amounts below this remove the level
    #[serde(default = "default_amount_epsilon")]
    pub amount_epsilon: f64,
    /// Reject batches whose event time goes backwards
    #[serde(default)]
    pub enforce_monotonic_time: bool,
}

impl BookConfig {
    pub fn new(max_levels: usize, price_epsilon: f64, amount_epsilon: f64) -> Self {
        Self {
            max_levels,
            price_epsilon,
            amount_epsilon,
            enforce_monotonic_time: false,
        }
    }

    pub fn with_monotonic_time(mut self, enforce: bool) -> Self {
        self.enforce_monotonic_time = enforce;
        self
    }

    pub fn validate(&self) -> OrderBookResult<()> {
        self.tolerance().map(|_| ())
    }

    /// Validated tolerance pair, also checks `max_levels`
    pub fn tolerance(&self) -> OrderBookResult<Tolerance> {
        if self.max_levels == 0 {
            return Err(OrderBookError::Configuration(
                "max_levels must be positive".to_string(),
            ));
        }
        Tolerance::new(self.price_epsilon, self.amount_epsilon)
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self::new(
            default_max_levels(),
            default_price_epsilon(),
            default_amount_epsilon(),
        )
    }
}

/// What the replay driver does with a line it cannot decode or apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log, count and continue with the next line
    #[default]
    Skip,
    /// Stop the replay and return the error
    Abort,
}

/// Settings for a file replay run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub book: BookConfig,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Decode every line up front on the rayon pool before applying
    #[serde(default)]
    pub parallel_decode: bool,
    /// Where to write Prometheus exposition text after the run
    #[serde(default)]
    pub metrics_output: Option<PathBuf>,
}

impl ReplayConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.book.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("failed to read config {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&text)
    }
}
