//! Model bundle, predictors and inference

pub mod aggregator;
pub mod ensemble;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;

pub use aggregator::FinalEstimator;
pub use ensemble::StackingEnsemble;
pub use inference::{Predictor, PredictorInvoker};
pub use loader::{ArtifactLoader, ModelBundle};
pub use scaler::MinMaxScaler;
