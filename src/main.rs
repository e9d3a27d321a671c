use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use maestro_core::config::Config;
use maestro_core::orchestrator::Orchestrator;

/// Maestro coordinator - module lifecycle orchestration and problem analysis
#[derive(Parser, Debug)]
#[command(name = "maestro", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyze one problem statement and exit
    #[arg(short, long)]
    problem: Option<String>,

    /// Register the built-in simulation, innovation, and dashboard modules
    #[arg(short, long)]
    demo: bool,

    /// Seconds between dispatch sweeps in the main loop
    #[arg(long, default_value_t = 60)]
    tick_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    info!(
        coordinator_id = %config.coordinator_id,
        tick_secs = args.tick_secs,
        "maestro coordinator starting"
    );

    let orchestrator = Orchestrator::new(&config);

    if args.demo {
        orchestrator.load_builtin_modules().await?;
        info!("built-in modules loaded");
    }

    // One-shot mode: analyze and print the record
    if let Some(problem) = &args.problem {
        match orchestrator.analyze(problem).await {
            Ok(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "analysis failed");
                return Err(e.into());
            }
        }
    }

    info!("coordinator ready, entering main loop");

    let mut sweep_interval = tokio::time::interval(Duration::from_secs(args.tick_secs.max(1)));

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                let report = orchestrator.run_all().await;
                if report.failed() > 0 {
                    warn!(
                        modules = report.len(),
                        failed = report.failed(),
                        "dispatch sweep finished with failures"
                    );
                } else {
                    info!(modules = report.len(), "dispatch sweep finished");
                }

                let health = orchestrator.health().await;
                info!(
                    healthy = health.healthy,
                    history_len = health.history_len,
                    facts = health.fact_count,
                    "health snapshot"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
