//! Error types for artifact loading, feature preparation and prediction.

use std::path::PathBuf;
use thiserror::Error;

/// Startup failures while loading the model bundle.
///
/// Every variant is terminal: no prediction can happen without a bundle.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The bundle file does not exist.
    #[error("model artifact not found at '{}'", path.display())]
    NotFound { path: PathBuf },

    /// The bundle exists but could not be read.
    #[error("failed to read model artifact '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bundle is not valid JSON or does not match the bundle layout.
    #[error("malformed model artifact '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The bundle parsed but its parts are inconsistent.
    #[error("invalid model artifact: {0}")]
    Invalid(String),

    /// The predictor kind needs a cargo feature this build lacks.
    #[error("predictor kind '{kind}' requires building with the '{feature}' feature")]
    Unsupported {
        kind: &'static str,
        feature: &'static str,
    },
}

impl ArtifactError {
    /// True for the missing-file case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArtifactError::NotFound { .. })
    }
}

/// Failures while turning a raw record into a feature vector.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    /// A categorical value outside its enumerated set or the product catalog.
    #[error("unknown value '{value}' for {field}")]
    UnknownCategory { field: &'static str, value: String },

    /// A numeric field outside its allowed range.
    #[error("{field} = {value} is outside the allowed range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The fitted scaler refused an input value.
    #[error("scaler rejected {field} = {value}")]
    ScalerRejected { field: String, value: f64 },
}

/// Failures raised while invoking the predictor.
///
/// Recoverable: the form stays usable after one of these.
#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    /// Feature vector length differs from what the predictor was trained on.
    #[error("shape mismatch: predictor expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Feature vector columns are not the canonical columns.
    #[error("column mismatch at position {position}: expected '{expected}', found '{found}'")]
    ColumnMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    /// The predictor produced NaN or infinity.
    #[error("predictor returned a non-finite value ({0})")]
    NonFinite(f64),

    /// Any failure reported by the predictor backend itself.
    #[error("predictor failed: {0}")]
    Backend(String),
}

/// Per-request failure, as seen by the form.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("could not prepare features: {0}")]
    Preparation(#[from] FeatureError),

    #[error("could not make a prediction: {0}")]
    Prediction(#[from] PredictionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_path() {
        let err = ArtifactError::NotFound {
            path: PathBuf::from("models/missing.json"),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("models/missing.json"));
    }

    #[test]
    fn test_request_error_wraps_prediction_message() {
        let err: RequestError = PredictionError::Backend("boom".to_string()).into();
        assert_eq!(
            err.to_string(),
            "could not make a prediction: predictor failed: boom"
        );
    }
}
