//! ONNX Runtime predictor backend (cargo feature `onnx`)

use crate::error::{ArtifactError, PredictionError};
use crate::models::inference::Predictor;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Regression model executed through an ONNX Runtime session.
pub struct OnnxPredictor {
    /// Sessions need exclusive access to run
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    n_features: usize,
}

impl OnnxPredictor {
    /// Load a model from file
    pub fn load(path: &Path, n_features: usize, threads: usize) -> Result<Self, ArtifactError> {
        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(path, e))?
            .with_intra_threads(threads)
            .map_err(|e| load_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| load_error(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // Regressors usually expose a single "variable" output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("variable") || o.name.contains("output"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "variable".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
        })
    }
}

impl Predictor for OnnxPredictor {
    fn name(&self) -> &str {
        "onnx"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        if features.len() != self.n_features {
            return Err(PredictionError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        // Input tensor of shape [1, num_features]
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, row.len() as i64];
        let input = Tensor::from_array((shape, row)).map_err(backend_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictionError::Backend(format!("Lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(backend_error)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PredictionError::Backend(format!("model has no output '{}'", self.output_name))
        })?;
        let (_, data) = output.try_extract_tensor::<f32>().map_err(backend_error)?;
        let value = data
            .first()
            .copied()
            .ok_or_else(|| PredictionError::Backend("model returned an empty tensor".to_string()))?;

        debug!(output = %self.output_name, value = value, "Extracted from tensor");

        Ok(value as f64)
    }
}

fn load_error(path: &Path, e: impl fmt::Display) -> ArtifactError {
    ArtifactError::Invalid(format!("failed to load ONNX model {}: {}", path.display(), e))
}

fn backend_error(e: impl fmt::Display) -> PredictionError {
    PredictionError::Backend(e.to_string())
}
