pub mod time;

use crate::orderbook::PriceLevel;

/// Render a level as `amount@price` for log lines
pub fn format_level(level: Option<PriceLevel>) -> String {
    match level {
        Some(level) => format!("{:.6}@{:.6}", level.amount, level.price),
        None => "-".to_string(),
    }
}
