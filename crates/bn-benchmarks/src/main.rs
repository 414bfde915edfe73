//! bn-bench: timed business network scenario over the in-memory ledger.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use bn_benchmarks::{BenchmarkHarness, HarnessConfig};
use bn_membership::{InMemoryNetwork, LedgerConfig, PollerConfig};
use bn_telemetry::{init_telemetry, TelemetryConfig};

/// bn-bench: Business network onboarding benchmark
#[derive(Parser, Debug)]
#[command(name = "bn-bench")]
#[command(about = "Time the single-member onboarding and suspension scenario")]
struct Args {
    /// Initial participants besides the authority
    #[arg(short, long, default_value = "5")]
    participants: usize,

    /// Maximum duration of any single phase, in milliseconds
    #[arg(short, long, default_value = "300000")]
    cutoff_ms: u64,

    /// Onboard the initial participants concurrently
    #[arg(long)]
    concurrent: bool,

    /// Base propagation delay between nodes, in milliseconds
    #[arg(long, default_value = "20")]
    propagation_delay_ms: u64,

    /// Random extra propagation delay per recipient, in milliseconds
    #[arg(long, default_value = "30")]
    propagation_jitter_ms: u64,

    /// Give up waiting for vault updates after this many seconds
    #[arg(long, default_value = "60")]
    deadline_secs: u64,

    /// Print the Prometheus metrics after the report
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let telemetry = init_telemetry(TelemetryConfig::for_tool("bench"))
        .context("Failed to initialise telemetry")?;

    let ledger = LedgerConfig::default().with_propagation(
        Duration::from_millis(args.propagation_delay_ms),
        Duration::from_millis(args.propagation_jitter_ms),
    );
    let config = HarnessConfig::default()
        .with_participants(args.participants)
        .with_cutoff(Duration::from_millis(args.cutoff_ms))
        .with_concurrent_onboarding(args.concurrent)
        .with_poller(PollerConfig::default().with_deadline(Duration::from_secs(args.deadline_secs)));

    info!(
        participants = args.participants,
        cutoff_ms = args.cutoff_ms,
        concurrent = args.concurrent,
        "Starting benchmark"
    );
    let harness = BenchmarkHarness::new(InMemoryNetwork::new(ledger), config)
        .context("Invalid benchmark configuration")?;
    let report = harness.run_benchmark().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if args.metrics {
        println!("{}", telemetry.metrics().encode()?);
    }
    Ok(())
}
