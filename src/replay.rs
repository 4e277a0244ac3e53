//! File replay driver
//!
//! Reads a depth log line by line: the first decodable record seeds the book,
//! every later record is applied and followed by one output line with the
//! new top of book.

use anyhow::{bail, Context};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ErrorPolicy, ReplayConfig};
use crate::feed::{FeedParser, FeedResult};
use crate::metrics::collectors::{LatencyCollector, LatencyStatistics, ThroughputCollector};
use crate::metrics::OrderBookMetrics;
use crate::orderbook::{OrderBook, OrderBookResult, TopOfBook, UpdateBatch};
use crate::publish::TopOfBookPublisher;
use crate::utils::time::{format_event_time, LatencyTimer};
use crate::utils::format_level;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

type DecodedLine = io::Result<(usize, FeedResult<Option<UpdateBatch>>)>;

/// Outcome of one replay run
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub lines_read: u64,
    pub batches_applied: u64,
    /// Lines without a depth payload
    pub lines_skipped: u64,
    /// Lines that failed to decode or apply under [`ErrorPolicy::Skip`]
    pub errors: u64,
    pub final_top: Option<TopOfBook>,
    pub apply_latency: LatencyStatistics,
}

pub struct ReplayDriver {
    book: OrderBook,
    parser: FeedParser,
    on_error: ErrorPolicy,
    parallel_decode: bool,
    metrics: Option<Arc<OrderBookMetrics>>,
    publisher: Option<TopOfBookPublisher>,
}

impl ReplayDriver {
    pub fn new(config: &ReplayConfig) -> OrderBookResult<Self> {
        Ok(Self {
            book: OrderBook::new(config.book.clone())?,
            parser: FeedParser::new(),
            on_error: config.on_error,
            parallel_decode: config.parallel_decode,
            metrics: None,
            publisher: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<OrderBookMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_publisher(mut self, publisher: TopOfBookPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Replay `input` into `output`, creating the output file
    pub fn run_files(&mut self, input: &Path, output: &Path) -> anyhow::Result<ReplaySummary> {
        let reader = File::open(input)
            .with_context(|| format!("failed to open input {}", input.display()))?;
        let writer = File::create(output)
            .with_context(|| format!("failed to create output {}", output.display()))?;

        info!("Replaying {} into {}", input.display(), output.display());
        self.run(BufReader::new(reader), BufWriter::new(writer))
    }

    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> anyhow::Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        let mut latencies = LatencyCollector::new();
        let mut progress = ThroughputCollector::new(PROGRESS_INTERVAL);

        for decoded in self.decode(input)? {
            let (line_no, decoded) = decoded.context("failed to read input")?;
            summary.lines_read += 1;

            let batch = match decoded {
                Ok(Some(batch)) => batch,
                Ok(None) => {
                    debug!("Line {} carries no depth payload", line_no);
                    summary.lines_skipped += 1;
                    continue;
                }
                Err(e) => {
                    self.handle_error(line_no, e.into(), &mut summary)?;
                    continue;
                }
            };

            if !self.book.is_initialized() {
                // A bad snapshot leaves nothing to apply against
                self.book
                    .init_levels(&batch)
                    .with_context(|| format!("invalid snapshot on line {}", line_no))?;
                self.publish();
                continue;
            }

            let timer = LatencyTimer::start();
            let result = self.book.apply(&batch);
            let elapsed = timer.stop();
            latencies.record(elapsed);

            match result {
                Ok(applied) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_latency(elapsed);
                        metrics.record_applied(&applied);
                        metrics.observe_book(&self.book);
                    }
                    self.publish();
                    self.book
                        .dump(&mut output)
                        .context("failed to write output record")?;
                    summary.batches_applied += 1;
                    progress.increment();
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_rejected();
                    }
                    self.handle_error(line_no, e.into(), &mut summary)?;
                }
            }

            if let Some(stats) = progress.collect() {
                info!(
                    "Replay progress: {} batches applied ({:.0}/s), book at {}",
                    summary.batches_applied,
                    stats.rate,
                    format_event_time(self.book.event_time())
                );
            }
        }

        output.flush().context("failed to flush output")?;

        if !self.book.is_initialized() {
            bail!("input contained no depth snapshot");
        }

        summary.final_top = Some(self.book.top_of_book());
        summary.apply_latency = latencies.drain();

        let stats = self.book.get_stats();
        info!(
            "Replay finished: {} lines, {} applied, {} skipped, {} errors, bid {} ask {}, dropped {}/{}",
            summary.lines_read,
            summary.batches_applied,
            summary.lines_skipped,
            summary.errors,
            format_level(stats.best_bid),
            format_level(stats.best_ask),
            stats.dropped_bids,
            stats.dropped_asks
        );
        Ok(summary)
    }

    // Streams lines, or decodes them all up front on the rayon pool
    fn decode<'a, R: BufRead + 'a>(
        &self,
        input: R,
    ) -> anyhow::Result<Box<dyn Iterator<Item = DecodedLine> + 'a>> {
        let parser = self.parser.clone();

        if !self.parallel_decode {
            return Ok(Box::new(input.lines().enumerate().map(move |(index, line)| {
                line.map(|line| (index + 1, parser.parse_line(&line)))
            })));
        }

        let lines = input
            .lines()
            .collect::<io::Result<Vec<String>>>()
            .context("failed to read input")?;
        debug!("Decoding {} lines in parallel", lines.len());

        let decoded = parser.parse_lines_parallel(&lines);
        Ok(Box::new(
            decoded
                .into_iter()
                .enumerate()
                .map(|(index, result)| Ok::<_, io::Error>((index + 1, result))),
        ))
    }

    fn handle_error(
        &self,
        line_no: usize,
        error: anyhow::Error,
        summary: &mut ReplaySummary,
    ) -> anyhow::Result<()> {
        match self.on_error {
            ErrorPolicy::Skip => {
                warn!("Skipping line {}: {}", line_no, error);
                summary.errors += 1;
                Ok(())
            }
            ErrorPolicy::Abort => Err(error.context(format!("replay aborted on line {}", line_no))),
        }
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.publish_from(&self.book);
        }
    }
}
