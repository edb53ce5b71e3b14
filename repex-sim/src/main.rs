// ABOUTME: Runs a replica-exchange ensemble on the local engine with simulated work.
// ABOUTME: Usage: repex-sim [-v...] [config.json]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use repex::prelude::*;

/// Run a replica-exchange ensemble with simulated work.
#[derive(Parser, Debug)]
#[command(name = "repex-sim", version)]
struct Args {
    /// Log more (repeat for more).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// JSON coordinator config; defaults apply when omitted.
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    repex::telemetry::init(args.verbose);

    let config = match &args.config {
        Some(path) => CoordinatorConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CoordinatorConfig::default(),
    };
    tracing::info!(?config, "starting ensemble");

    let replicas = config.build_ensemble();
    let simulation = SleepSimulation::new(Duration::from_millis(200), Duration::from_millis(50));
    let engine = Arc::new(LocalEngine::new(&replicas, simulation));
    let coordinator = ExchangeCoordinator::from_config(&config, replicas.clone(), engine.clone())?
        .start()
        .await?;

    let outcome = engine.run(coordinator.clone()).await;
    coordinator.terminate().await?;

    for replica in &replicas {
        println!(
            "replica {:>3}  cycle {:>3}  {}",
            replica.id(),
            replica.cycle(),
            replica.state()
        );
    }

    outcome.context("ensemble aborted")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_count_verbosity_and_take_config() {
        let args = Args::try_parse_from(["repex-sim", "-vv", "run.json"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, Some(PathBuf::from("run.json")));

        let args = Args::try_parse_from(["repex-sim"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_args_reject_second_config() {
        assert!(Args::try_parse_from(["repex-sim", "a.json", "b.json"]).is_err());
    }
}
