//! Startup and run loop shared by the binary and its tests.

use crate::config::AppConfig;
use crate::display::{render_fatal, render_report, render_request_error};
use crate::form::TerminalForm;
use crate::models::loader::ArtifactLoader;
use crate::session::{ForecastContext, ForecastSession};
use crate::types::record::RawRecord;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Startup failed, or the one-shot record could not be predicted
    Failure,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::Failure => ExitCode::FAILURE,
        }
    }
}

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions<'a> {
    /// Predict this JSON record instead of running the form
    pub record: Option<&'a Path>,
    /// Hide the input and prepared rows
    pub no_details: bool,
}

/// Load the bundle, then run the form (or the one-shot record) over the given streams.
///
/// Without a bundle the fatal message goes to `err` and the form is never shown.
pub fn run<R: BufRead, W: Write, E: Write>(
    config: &AppConfig,
    options: RunOptions<'_>,
    input: R,
    mut out: W,
    mut err: E,
) -> Result<RunStatus> {
    let loader = ArtifactLoader::with_threads(config.artifact.onnx_threads);
    let bundle = match loader.load(&config.artifact.path) {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(error = %e, "Model bundle unavailable");
            render_fatal(&mut err, &e)?;
            return Ok(RunStatus::Failure);
        }
    };

    let catalog = config.resolve_catalog(&bundle)?;
    info!(products = catalog.len(), "Product catalog resolved");

    let context = Arc::new(ForecastContext::new(bundle, catalog));
    let session = ForecastSession::new(context, config.form.preview_columns);

    let status = match options.record {
        Some(path) => predict_record(&session, path, &mut out, &mut err)?,
        None => {
            let show_details = config.form.show_details && !options.no_details;
            run_form(&session, show_details, input, &mut out)?;
            RunStatus::Success
        }
    };

    info!("Demand forecast shutting down...");
    session.metrics().print_summary();

    Ok(status)
}

fn run_form<R: BufRead, W: Write>(
    session: &ForecastSession,
    show_details: bool,
    input: R,
    out: W,
) -> Result<()> {
    let mut form = TerminalForm::new(input, out);
    let catalog = &session.context().catalog;

    loop {
        let Some(record) = form.read_record(catalog)? else {
            break;
        };

        match session.submit(&record) {
            Ok(report) => render_report(form.output(), &report, show_details)?,
            Err(e) => render_request_error(form.output(), &e)?,
        }

        if form.confirm("\nMake another prediction?", true)? != Some(true) {
            break;
        }
    }

    form.output().flush()?;
    Ok(())
}

fn predict_record<W: Write, E: Write>(
    session: &ForecastSession,
    path: &Path,
    out: &mut W,
    err: &mut E,
) -> Result<RunStatus> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record {}", path.display()))?;
    let record: RawRecord = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse record {}", path.display()))?;

    match session.submit(&record) {
        Ok(report) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            Ok(RunStatus::Success)
        }
        Err(e) => {
            render_request_error(err, &e)?;
            Ok(RunStatus::Failure)
        }
    }
}
