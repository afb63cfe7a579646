//! Forecast session: the loaded context plus the per-request error boundary.

use crate::error::RequestError;
use crate::feature_preparer::FeaturePreparer;
use crate::metrics::SessionMetrics;
use crate::models::inference::PredictorInvoker;
use crate::models::loader::ModelBundle;
use crate::types::catalog::ProductCatalog;
use crate::types::prediction::PredictionResult;
use crate::types::record::RawRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Everything a request needs, loaded once and never mutated.
#[derive(Debug)]
pub struct ForecastContext {
    pub bundle: ModelBundle,
    pub catalog: ProductCatalog,
}

impl ForecastContext {
    pub fn new(bundle: ModelBundle, catalog: ProductCatalog) -> Self {
        Self { bundle, catalog }
    }
}

/// Outcome of one successful submission
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub result: PredictionResult,
    /// The record as submitted
    pub input: RawRecord,
    /// Leading prepared columns and active indicators
    pub prepared_preview: Vec<(String, f64)>,
}

/// Runs submissions against a shared context.
pub struct ForecastSession {
    context: Arc<ForecastContext>,
    metrics: SessionMetrics,
    preview_columns: usize,
}

impl ForecastSession {
    pub fn new(context: Arc<ForecastContext>, preview_columns: usize) -> Self {
        info!(
            predictor = context.bundle.predictor().name(),
            features = context.bundle.columns().len(),
            products = context.catalog.len(),
            "Forecast session ready"
        );

        Self {
            context,
            metrics: SessionMetrics::new(),
            preview_columns,
        }
    }

    pub fn context(&self) -> &ForecastContext {
        &self.context
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// One full prepare-then-predict pass.
    ///
    /// Both error kinds end only this request; the session stays usable.
    pub fn submit(&self, record: &RawRecord) -> Result<PredictionReport, RequestError> {
        let start = Instant::now();
        let ForecastContext { bundle, catalog } = self.context.as_ref();

        let features = match FeaturePreparer::new(bundle, catalog).prepare(record) {
            Ok(features) => features,
            Err(e) => {
                self.metrics.record_preparation_failure(start.elapsed());
                warn!(product = %record.product, error = %e, "Feature preparation failed");
                return Err(e.into());
            }
        };

        match PredictorInvoker::new(bundle).invoke(&features) {
            Ok(result) => {
                let elapsed = start.elapsed();
                self.metrics.record_prediction(elapsed, result.units);
                info!(
                    request_id = %result.request_id,
                    product = %record.product,
                    units = result.units,
                    processing_time_us = elapsed.as_micros() as u64,
                    "Demand predicted"
                );

                let prepared_preview = features
                    .preview(self.preview_columns)
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect();

                Ok(PredictionReport {
                    result,
                    input: record.clone(),
                    prepared_preview,
                })
            }
            Err(e) => {
                self.metrics.record_prediction_failure(start.elapsed());
                warn!(product = %record.product, error = %e, "Prediction failed");
                Err(e.into())
            }
        }
    }
}
