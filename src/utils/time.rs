use chrono::{DateTime, TimeZone, Utc};
use std::time::{Duration, Instant};

use crate::orderbook::EventTime;

/// Timer for measuring operation latency
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

/// Interpret an exchange event time (milliseconds since epoch) as UTC
pub fn event_time_to_utc(event_time: EventTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(event_time).single()
}

/// Human-readable event time for logs, falls back to the raw value
pub fn format_event_time(event_time: EventTime) -> String {
    event_time_to_utc(event_time)
        .map(|time| time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| event_time.to_string())
}
