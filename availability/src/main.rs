//! Main entry point for the ha-runner binary
//!
//! Loads a scenario and a node context, runs the scenario once and writes the
//! run result as JSON. The exit status is non-zero when the scenario fails.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use availability::{HaContext, ScenarioGeneral};
use shared::config::{load_catalog, load_context, load_scenario};
use shared::{logging, process_debug, process_info, ContextConfig, ProcessId, RunResult};

/// Runs one availability scenario against the system under test
#[derive(Parser)]
#[command(name = "ha-runner")]
#[command(about = "Runs an availability scenario: inject faults, monitor outages, verify the SLA")]
pub struct Args {
    /// Scenario file (JSON or YAML)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Node context file mapping node names to connection parameters
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Script catalog file
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Write the run result JSON here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ProcessId::init_runner();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), &format!("scenario {}", args.scenario.display()));

    let scenario = load_scenario(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;
    let config = match &args.context {
        Some(path) => load_context(path).with_context(|| format!("loading context {}", path.display()))?,
        None => ContextConfig::default(),
    };
    let mut context = HaContext::new(config);
    if let Some(path) = &args.catalog {
        context = context.with_catalog(load_catalog(path).with_context(|| format!("loading catalog {}", path.display()))?);
    }
    process_debug!(ProcessId::current(), "Context: {:?}", context);

    let mut runner = ScenarioGeneral::new(scenario, context);
    process_info!(ProcessId::current(), "📋 Run id {}", runner.run_id());

    runner.setup().await.context("scenario setup")?;
    let mut result = RunResult::new();
    runner.run(&mut result).await.context("scenario run")?;
    let verdict = runner.teardown().await;
    logging::log_shutdown(ProcessId::current(), "scenario finished");

    let rendered = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("writing result {}", path.display()))?;
        }
        None => println!("{rendered}"),
    }

    match verdict {
        Ok(()) => {
            logging::log_success(ProcessId::current(), "Scenario passed");
            Ok(())
        }
        Err(e) => {
            logging::log_error(ProcessId::current(), "Scenario", &e);
            Err(e.into())
        }
    }
}
