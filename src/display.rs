//! Rendering of predictions and errors for the terminal form

use crate::error::{ArtifactError, RequestError};
use crate::session::PredictionReport;
use std::io::{self, Write};

/// Print the prediction, and optionally the input and prepared rows.
pub fn render_report<W: Write>(
    out: &mut W,
    report: &PredictionReport,
    show_details: bool,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Predicted demand: {} units.",
        report.result.units
    )?;

    if !show_details {
        return Ok(());
    }

    writeln!(out, "---")?;
    writeln!(out, "Input:")?;
    for (field, value) in report.input.rows() {
        writeln!(out, "  {:<34} {}", field, value)?;
    }

    writeln!(out, "Prepared features (partial):")?;
    for (column, value) in &report.prepared_preview {
        writeln!(out, "  {:<34} {:.6}", column, value)?;
    }
    writeln!(
        out,
        "Raw model output {:.4} (request {})",
        report.result.raw_output, report.result.request_id
    )?;

    Ok(())
}

/// Print a per-request failure; the form continues afterwards.
pub fn render_request_error<W: Write>(out: &mut W, err: &RequestError) -> io::Result<()> {
    match err {
        RequestError::Preparation(e) => writeln!(out, "\nInvalid input: {}.", e),
        RequestError::Prediction(e) => {
            writeln!(out, "\nAn error occurred while making the prediction: {}", e)
        }
    }
}

/// Print the startup failure shown instead of the form.
pub fn render_fatal<W: Write>(out: &mut W, err: &ArtifactError) -> io::Result<()> {
    match err {
        ArtifactError::NotFound { path } => writeln!(
            out,
            "Error: model file '{}' was not found. No predictions can be made without it.",
            path.display()
        ),
        other => writeln!(
            out,
            "Error: the model file could not be loaded ({}). No predictions can be made.",
            other
        ),
    }
}
