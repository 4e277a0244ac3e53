//! Depth Log Replay
//!
//! Replays a recorded depth log through the order book and writes one
//! `eventTime bidPrice bidAmount askPrice askAmount` line per update.
//!
//! Usage:
//!   depth_replay --input data/huobi_global_depth.log --output data/answers.log
//!   depth_replay --config replay.toml --max-levels 50

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use orderbook_depth_engine::{ErrorPolicy, OrderBookMetrics, ReplayConfig, ReplayDriver};

#[derive(Parser)]
#[command(name = "depth_replay", about = "Replay a depth log into top-of-book records")]
struct Args {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Depth log to replay
    #[arg(long)]
    input: Option<PathBuf>,

    /// File receiving one record per applied update
    #[arg(long)]
    output: Option<PathBuf>,

    /// Levels kept per side
    #[arg(long)]
    max_levels: Option<usize>,

    /// Price equality tolerance
    #[arg(long)]
    price_epsilon: Option<f64>,

    /// Amount below which a level is removed
    #[arg(long)]
    amount_epsilon: Option<f64>,

    /// Reject batches whose event time goes backwards
    #[arg(long)]
    monotonic: bool,

    /// Stop at the first bad line instead of skipping it
    #[arg(long)]
    abort_on_error: bool,

    /// Decode all lines on the thread pool before applying
    #[arg(long)]
    parallel_decode: bool,

    /// Write Prometheus metrics text here when the replay ends
    #[arg(long)]
    metrics_output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<ReplayConfig> {
        let mut config = match &self.config {
            Some(path) => ReplayConfig::from_file(path)?,
            None => ReplayConfig::default(),
        };

        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(output) = self.output {
            config.output = Some(output);
        }
        if let Some(max_levels) = self.max_levels {
            config.book.max_levels = max_levels;
        }
        if let Some(price_epsilon) = self.price_epsilon {
            config.book.price_epsilon = price_epsilon;
        }
        if let Some(amount_epsilon) = self.amount_epsilon {
            config.book.amount_epsilon = amount_epsilon;
        }
        if self.monotonic {
            config.book.enforce_monotonic_time = true;
        }
        if self.abort_on_error {
            config.on_error = ErrorPolicy::Abort;
        }
        if self.parallel_decode {
            config.parallel_decode = true;
        }
        if let Some(path) = self.metrics_output {
            config.metrics_output = Some(path);
        }

        config.book.validate()?;
        Ok(config)
    }
}

fn init_tracing(json: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json, &args.log_level);

    let config = args.into_config()?;
    let (Some(input), Some(output)) = (config.input.clone(), config.output.clone()) else {
        bail!("both input and output paths are required (flags or config file)");
    };

    let prometheus = match &config.metrics_output {
        Some(_) => Some(
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install Prometheus recorder")?,
        ),
        None => None,
    };

    let metrics = Arc::new(OrderBookMetrics::new());
    let mut driver = ReplayDriver::new(&config)?.with_metrics(Arc::clone(&metrics));
    let summary = driver.run_files(&input, &output)?;

    let latency = summary.apply_latency.to_micros();
    info!(
        "Apply latency (μs): mean={:.3} p50={:.3} p99={:.3} p999={:.3} max={:.3} over {} batches",
        latency.mean, latency.p50, latency.p99, latency.p999, latency.max, latency.count
    );
    if let Some(top) = summary.final_top {
        info!("Final top of book: {}", top);
    }

    if let (Some(handle), Some(path)) = (prometheus, &config.metrics_output) {
        std::fs::write(path, handle.render())
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        info!("Metrics written to {}", path.display());
    }

    Ok(())
}
