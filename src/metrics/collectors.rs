use std::time::{Duration, Instant};

/// Samples kept by a [`LatencyCollector`] unless configured otherwise
pub const DEFAULT_MAX_SAMPLES: usize = 65_536;

/// Collects and aggregates latency statistics
///
/// Count, min, max and mean cover every recorded sample. Percentiles come
/// from a buffer capped at `max_samples`: once it fills, every other sample
/// is discarded and only every `stride`-th new sample is kept.
#[derive(Debug)]
pub struct LatencyCollector {
    samples: Vec<Duration>,
    max_samples: usize,
    stride: u64,
    recorded: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

impl LatencyCollector {
    pub fn new() -> Self {
        Self::with_max_samples(DEFAULT_MAX_SAMPLES)
    }

    pub fn with_max_samples(max_samples: usize) -> Self {
        let max_samples = max_samples.max(2);
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
            stride: 1,
            recorded: 0,
            total: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Add a latency sample
    pub fn record(&mut self, latency: Duration) {
        if self.recorded == 0 {
            self.min = latency;
            self.max = latency;
        } else {
            self.min = self.min.min(latency);
            self.max = self.max.max(latency);
        }
        self.total += latency;

        if self.recorded % self.stride == 0 {
            self.samples.push(latency);
            if self.samples.len() >= self.max_samples {
                self.thin();
            }
        }
        self.recorded += 1;
    }

    /// Samples currently buffered for percentiles
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Collect whatever has been recorded and reset
    pub fn drain(&mut self) -> LatencyStatistics {
        let stats = self.calculate_stats();
        self.samples.clear();
        self.stride = 1;
        self.recorded = 0;
        self.total = Duration::ZERO;
        self.min = Duration::ZERO;
        self.max = Duration::ZERO;
        stats
    }

    // Keeps the samples taken at multiples of the doubled stride
    fn thin(&mut self) {
        let mut index = 0usize;
        self.samples.retain(|_| {
            let keep = index % 2 == 0;
            index += 1;
            keep
        });
        self.stride *= 2;
    }

    fn calculate_stats(&self) -> LatencyStatistics {
        if self.recorded == 0 {
            return LatencyStatistics::default();
        }

        let mut sorted_samples = self.samples.clone();
        sorted_samples.sort();

        let len = sorted_samples.len();
        let percentile = |q: f64| sorted_samples[((len as f64 * q) as usize).min(len - 1)];
        let mean_nanos = self.total.as_nanos() / u128::from(self.recorded);

        LatencyStatistics {
            count: self.recorded,
            min: self.min,
            max: self.max,
            mean: Duration::from_nanos(mean_nanos as u64),
            p50: percentile(0.50),
            p95: percentile(0.95),
            p99: percentile(0.99),
            p999: percentile(0.999),
        }
    }
}

impl Default for LatencyCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregated latency statistics
#[derive(Debug, Clone, Default)]
pub struct LatencyStatistics {
    pub count: u64,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub p999: Duration,
}

impl LatencyStatistics {
    /// Convert to microseconds for easier reading
    pub fn to_micros(&self) -> LatencyMicros {
        let micros = |d: Duration| d.as_nanos() as f64 / 1_000.0;
        LatencyMicros {
            count: self.count,
            min: micros(self.min),
            max: micros(self.max),
            mean: micros(self.mean),
            p50: micros(self.p50),
            p95: micros(self.p95),
            p99: micros(self.p99),
            p999: micros(self.p999),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatencyMicros {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
}

/// Counts operations and reports the rate per interval
#[derive(Debug)]
pub struct ThroughputCollector {
    count: u64,
    last_count: u64,
    last_collection: Instant,
    collection_interval: Duration,
}

impl ThroughputCollector {
    pub fn new(collection_interval: Duration) -> Self {
        Self {
            count: 0,
            last_count: 0,
            last_collection: Instant::now(),
            collection_interval,
        }
    }

    /// Increment the counter
    pub fn increment(&mut self) {
        self.count += 1;
    }

    /// Collect throughput statistics
    pub fn collect(&mut self) -> Option<ThroughputStatistics> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_collection);

        if elapsed >= self.collection_interval {
            let operations = self.count - self.last_count;
            let rate = operations as f64 / elapsed.as_secs_f64();

            self.last_collection = now;
            self.last_count = self.count;

            Some(ThroughputStatistics {
                operations,
                rate,
                total: self.count,
                interval: elapsed,
            })
        } else {
            None
        }
    }
}

/// Throughput statistics
#[derive(Debug, Clone)]
pub struct ThroughputStatistics {
    pub operations: u64,
    pub rate: f64,
    pub total: u64,
    pub interval: Duration,
}
