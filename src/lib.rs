//! Monthly Product Demand Forecast Library
//!
//! Collects product and period attributes, prepares them exactly as the
//! training pipeline did, and predicts monthly demand with a pre-trained
//! regression ensemble.

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod feature_preparer;
pub mod form;
pub mod metrics;
pub mod models;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::AppConfig;
pub use error::{ArtifactError, FeatureError, PredictionError, RequestError};
pub use feature_preparer::{FeaturePreparer, FeatureVector};
pub use models::{ArtifactLoader, ModelBundle, Predictor, PredictorInvoker};
pub use session::{ForecastContext, ForecastSession, PredictionReport};
pub use types::{PredictionResult, RawRecord};
