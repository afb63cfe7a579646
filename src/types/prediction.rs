//! Prediction result returned to the form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Predicted monthly demand for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Request identifier, for correlating log lines
    pub request_id: String,

    /// Predicted demand, rounded half-to-even and clamped at zero
    pub units: u64,

    /// Unrounded ensemble output
    pub raw_output: f64,

    /// When the prediction was made
    pub predicted_at: DateTime<Utc>,
}

impl PredictionResult {
    /// Build a result from the raw ensemble output.
    ///
    /// Callers must pass a finite value.
    pub fn from_raw(raw_output: f64) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            units: round_units(raw_output),
            raw_output,
            predicted_at: Utc::now(),
        }
    }
}

/// Round to the nearest unit, ties to even; negative demand becomes zero.
pub fn round_units(raw: f64) -> u64 {
    let rounded = raw.round_ties_even();
    if rounded <= 0.0 {
        0
    } else {
        rounded as u64
    }
}
