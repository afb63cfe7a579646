//! Predictor invocation: one aligned feature vector in, one rounded demand out.

use crate::error::PredictionError;
use crate::feature_preparer::FeatureVector;
use crate::models::loader::ModelBundle;
use crate::types::prediction::PredictionResult;
use std::time::Instant;
use tracing::{debug, warn};

/// A trained regression model.
///
/// Implementations must be read-only after construction so one instance can
/// serve every request of a session.
pub trait Predictor: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict one row.
    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError>;
}

/// Calls the bundle's predictor on prepared vectors.
pub struct PredictorInvoker<'a> {
    bundle: &'a ModelBundle,
}

impl<'a> PredictorInvoker<'a> {
    pub fn new(bundle: &'a ModelBundle) -> Self {
        Self { bundle }
    }

    /// Run the predictor and round its output.
    ///
    /// The vector must carry exactly the bundle's canonical columns.
    pub fn invoke(&self, features: &FeatureVector<'_>) -> Result<PredictionResult, PredictionError> {
        self.check_alignment(features)?;

        let predictor = self.bundle.predictor();
        let start = Instant::now();
        let raw = predictor.predict(features.values())?;

        if !raw.is_finite() {
            warn!(predictor = predictor.name(), raw = raw, "Predictor returned non-finite output");
            return Err(PredictionError::NonFinite(raw));
        }
        if raw < 0.0 {
            debug!(raw = raw, "Negative demand clamped to zero");
        }

        let result = PredictionResult::from_raw(raw);
        debug!(
            request_id = %result.request_id,
            predictor = predictor.name(),
            raw = raw,
            units = result.units,
            inference_us = start.elapsed().as_micros() as u64,
            "Prediction complete"
        );

        Ok(result)
    }

    fn check_alignment(&self, features: &FeatureVector<'_>) -> Result<(), PredictionError> {
        let expected = self.bundle.columns();
        let found = features.columns();

        if expected.len() != found.len() || found.len() != features.values().len() {
            return Err(PredictionError::ShapeMismatch {
                expected: expected.len(),
                actual: features.values().len(),
            });
        }

        if let Some((position, (e, f))) = expected
            .iter()
            .zip(found)
            .enumerate()
            .find(|(_, (e, f))| e != f)
        {
            return Err(PredictionError::ColumnMismatch {
                position,
                expected: e.clone(),
                found: f.clone(),
            });
        }

        Ok(())
    }
}
