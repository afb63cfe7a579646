//! Demand Forecast - Main Entry Point
//!
//! Loads the model bundle, then runs the terminal form: each submission is
//! prepared, predicted and displayed until the user stops or input ends.

use anyhow::{Context, Result};
use clap::Parser;
use demand_forecast::{
    app::{run, RunOptions},
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "demand-forecast", about = "Predict monthly product demand")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Predict a single JSON record instead of running the form
    #[arg(long)]
    record: Option<PathBuf>,

    /// Hide the input and prepared rows after each prediction
    #[arg(long)]
    no_details: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = AppConfig::load_from_path(&args.config)?;
    init_logging(&config.logging)?;

    info!("Starting demand forecast");
    info!(
        config = %args.config.display(),
        artifact = %config.artifact.path.display(),
        "Configuration loaded successfully"
    );

    let options = RunOptions {
        record: args.record.as_deref(),
        no_details: args.no_details,
    };
    let stdin = io::stdin();
    let status = run(&config, options, stdin.lock(), io::stdout(), io::stderr())?;

    Ok(status.into())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("demand_forecast={}", logging.level))
            .context("Invalid logging.level")?,
    };

    // Logs go to stderr so the form owns stdout.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
