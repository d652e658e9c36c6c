//! proptrack CLI - drive and observe policy propagation progress.

mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proptrack_core::{ProgressSnapshot, RunKey};
use proptrack_progress::{
    BroadcastSink, FanoutSink, FeatureGate, TrackerConfig, TrackerFactory, TracingSink,
};
use proptrack_storage::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use simulate::SimulationPlan;

#[derive(Parser)]
#[command(name = "proptrack")]
#[command(about = "Policy propagation progress tracker", long_about = None)]
struct Cli {
    /// Tracker configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a propagation run against an in-memory store
    Simulate {
        /// Run key (policy configuration id)
        #[arg(long, default_value = "1")]
        run: String,
        /// Number of projects
        #[arg(long, default_value = "20")]
        projects: u64,
        /// Projects registered per dispatcher batch
        #[arg(long, default_value = "5")]
        batch_size: usize,
        /// Number of merge requests
        #[arg(long, default_value = "4")]
        merge_requests: u64,
        /// Workers per merge request
        #[arg(long, default_value = "2")]
        workers_per_mr: u32,
        /// Fail every n-th project (0 = none)
        #[arg(long, default_value = "0")]
        fail_every: u64,
        /// Run with tracking disabled
        #[arg(long)]
        disabled: bool,
        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            run,
            projects,
            batch_size,
            merge_requests,
            workers_per_mr,
            fail_every,
            disabled,
            json,
        } => {
            let run_key: RunKey = run.parse().context("invalid run key")?;
            let plan = SimulationPlan {
                run_key,
                projects,
                batch_size,
                merge_requests,
                workers_per_merge_request: workers_per_mr,
                fail_every,
            };

            let broadcast = BroadcastSink::new(1024);
            let mut snapshots = broadcast.subscribe();
            let printer = tokio::spawn(async move {
                loop {
                    match snapshots.recv().await {
                        Ok(snapshot) => print_snapshot(&snapshot, json),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "snapshot printer lagging")
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            let sink = FanoutSink::new()
                .with(Arc::new(TracingSink))
                .with(Arc::new(broadcast));
            let factory = TrackerFactory::new(Arc::new(MemoryStore::new()))
                .with_gate(Arc::new(FeatureGate::all(!disabled)))
                .with_sink(Arc::new(sink))
                .with_config(config);

            let report = simulate::run(&plan, &factory).await?;
            // Closes the snapshot channel so the printer drains and exits.
            drop(factory);
            printer.await?;

            println!("Final report for run {}", plan.run_key);
            match report.final_snapshot {
                Some(snapshot) => {
                    println!(
                        "  Projects: {}% of {}",
                        snapshot.project_progress_pct, snapshot.total_project_count
                    );
                    println!(
                        "  Merge requests: {}% of {}",
                        snapshot.merge_request_progress_pct, snapshot.total_merge_request_count
                    );
                }
                None => println!("  Not tracked"),
            }
            let failed: Vec<String> = report
                .failed_after_clear
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("  Failed projects: [{}]", failed.join(", "));
            println!("  In progress after clear: {}", report.in_progress_after_clear);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &ProgressSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "failed to encode snapshot"),
        }
        return;
    }
    println!(
        "[run {}] projects {:>3}% of {} (failed: {}) | merge requests {:>3}% of {}",
        snapshot.run_key,
        snapshot.project_progress_pct,
        snapshot.total_project_count,
        snapshot.failed_count(),
        snapshot.merge_request_progress_pct,
        snapshot.total_merge_request_count,
    );
}
