//! Model bundle loader
//!
//! A bundle is one JSON file holding the predictor, the canonical feature
//! columns and the fitted scaler. The three are loaded and validated together;
//! callers either get a complete [`ModelBundle`] or an [`ArtifactError`].

use crate::error::ArtifactError;
use crate::models::ensemble::{StackingEnsemble, StackingSpec};
use crate::models::inference::Predictor;
use crate::models::scaler::{MinMaxScaler, ScalerSpec};
use crate::types::record::columns as source_columns;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Bundle layout version this build reads.
pub const FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

/// Serialized predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorSpec {
    Stacking(StackingSpec),
    /// ONNX model stored next to the bundle
    Onnx { path: PathBuf, n_features: usize },
}

/// On-disk bundle document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleFile {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Canonical feature columns, in training order
    pub columns: Vec<String>,
    pub scaler: ScalerSpec,
    pub predictor: PredictorSpec,
}

/// The immutable (predictor, columns, scaler) triple.
pub struct ModelBundle {
    predictor: Box<dyn Predictor>,
    columns: Vec<String>,
    scaler: MinMaxScaler,
}

impl ModelBundle {
    /// Assemble a bundle, checking that the three parts agree.
    pub fn new(
        predictor: Box<dyn Predictor>,
        columns: Vec<String>,
        scaler: MinMaxScaler,
    ) -> Result<Self, ArtifactError> {
        if columns.is_empty() {
            return Err(ArtifactError::Invalid("column list is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ArtifactError::Invalid(format!(
                "column '{}' appears more than once",
                duplicate
            )));
        }

        if scaler.feature_names() != source_columns::SCALED {
            return Err(ArtifactError::Invalid(format!(
                "scaler is fitted on {:?}, expected {:?}",
                scaler.feature_names(),
                source_columns::SCALED
            )));
        }

        if predictor.n_features() != columns.len() {
            return Err(ArtifactError::Invalid(format!(
                "predictor expects {} features but the bundle lists {} columns",
                predictor.n_features(),
                columns.len()
            )));
        }

        Ok(Self {
            predictor,
            columns,
            scaler,
        })
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Canonical column list: the alignment contract for every feature vector.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("predictor", &self.predictor.name())
            .field("columns", &self.columns.len())
            .field("scaler", &self.scaler)
            .finish()
    }
}

/// Loader for bundle files
#[derive(Debug)]
pub struct ArtifactLoader {
    /// Intra-op threads for ONNX sessions
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ArtifactLoader {
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load and validate a bundle from disk.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ModelBundle, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::NotFound {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), "Loading model bundle");

        let contents = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: BundleFile =
            serde_json::from_str(&contents).map_err(|source| ArtifactError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let bundle = self.assemble(file, base_dir)?;

        info!(
            predictor = bundle.predictor().name(),
            columns = bundle.columns().len(),
            "Model bundle loaded successfully"
        );

        Ok(bundle)
    }

    /// Build a bundle from an already parsed document; relative predictor paths resolve against `base_dir`.
    pub fn assemble(&self, file: BundleFile, base_dir: &Path) -> Result<ModelBundle, ArtifactError> {
        if file.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Invalid(format!(
                "unsupported bundle format version {} (expected {})",
                file.format_version, FORMAT_VERSION
            )));
        }

        let scaler = MinMaxScaler::from_spec(&file.scaler)?;
        let predictor = self.build_predictor(file.predictor, base_dir)?;

        ModelBundle::new(predictor, file.columns, scaler)
    }

    fn build_predictor(
        &self,
        spec: PredictorSpec,
        base_dir: &Path,
    ) -> Result<Box<dyn Predictor>, ArtifactError> {
        match spec {
            PredictorSpec::Stacking(stacking) => Ok(Box::new(StackingEnsemble::new(stacking)?)),
            PredictorSpec::Onnx { path, n_features } => {
                let path = base_dir.join(path);
                self.build_onnx(&path, n_features)
            }
        }
    }

    #[cfg(feature = "onnx")]
    fn build_onnx(&self, path: &Path, n_features: usize) -> Result<Box<dyn Predictor>, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let model = crate::models::onnx::OnnxPredictor::load(path, n_features, self.onnx_threads)?;
        Ok(Box::new(model))
    }

    #[cfg(not(feature = "onnx"))]
    fn build_onnx(&self, path: &Path, _n_features: usize) -> Result<Box<dyn Predictor>, ArtifactError> {
        tracing::error!(
            path = %path.display(),
            "Bundle references an ONNX model but ONNX support is not compiled in"
        );
        Err(ArtifactError::Unsupported {
            kind: "onnx",
            feature: "onnx",
        })
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}
