//! Fitted min-max scaler
//!
//! Statistics come from the training run and are never refitted here.

use crate::error::{ArtifactError, FeatureError};
use serde::{Deserialize, Serialize};

/// Serialized scaler statistics, as stored in the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerSpec {
    /// Columns the scaler was fitted on, in order
    pub feature_names: Vec<String>,
    /// Per-feature minimum seen during fitting
    pub data_min: Vec<f64>,
    /// Per-feature maximum seen during fitting
    pub data_max: Vec<f64>,
    /// Target range of the transform
    #[serde(default = "default_feature_range")]
    pub feature_range: [f64; 2],
}

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

/// Min-max scaler: `x * scale + min` per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    feature_names: Vec<String>,
    scale: Vec<f64>,
    min: Vec<f64>,
}

impl MinMaxScaler {
    /// Build a scaler from fitted statistics.
    pub fn from_spec(spec: &ScalerSpec) -> Result<Self, ArtifactError> {
        let n = spec.feature_names.len();
        if n == 0 {
            return Err(ArtifactError::Invalid("scaler has no features".to_string()));
        }
        if spec.data_min.len() != n || spec.data_max.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "scaler statistics cover {}/{} values for {} features",
                spec.data_min.len(),
                spec.data_max.len(),
                n
            )));
        }

        let [range_lo, range_hi] = spec.feature_range;
        if !(range_lo.is_finite() && range_hi.is_finite() && range_lo < range_hi) {
            return Err(ArtifactError::Invalid(format!(
                "scaler feature range {:?} is not increasing",
                spec.feature_range
            )));
        }

        let mut scale = Vec::with_capacity(n);
        let mut min = Vec::with_capacity(n);
        for (i, (&lo, &hi)) in spec.data_min.iter().zip(&spec.data_max).enumerate() {
            if !(lo.is_finite() && hi.is_finite()) || hi < lo {
                return Err(ArtifactError::Invalid(format!(
                    "scaler statistics for '{}' are invalid (min {}, max {})",
                    spec.feature_names[i], lo, hi
                )));
            }
            // Constant features keep a unit range, as in the fitting library.
            let data_range = if hi - lo == 0.0 { 1.0 } else { hi - lo };
            let s = (range_hi - range_lo) / data_range;
            scale.push(s);
            min.push(range_lo - lo * s);
        }

        Ok(Self {
            feature_names: spec.feature_names.clone(),
            scale,
            min,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Scale one row. Values must be finite; out-of-range values are not clipped.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        self.check_width(row)?;
        row.iter()
            .enumerate()
            .map(|(i, &x)| {
                if x.is_finite() {
                    Ok(x * self.scale[i] + self.min[i])
                } else {
                    Err(FeatureError::ScalerRejected {
                        field: self.feature_names[i].clone(),
                        value: x,
                    })
                }
            })
            .collect()
    }

    /// Undo [`transform`](Self::transform) for one row.
    pub fn inverse_transform(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        self.check_width(row)?;
        row.iter()
            .enumerate()
            .map(|(i, &x)| {
                if x.is_finite() {
                    Ok((x - self.min[i]) / self.scale[i])
                } else {
                    Err(FeatureError::ScalerRejected {
                        field: self.feature_names[i].clone(),
                        value: x,
                    })
                }
            })
            .collect()
    }

    fn check_width(&self, row: &[f64]) -> Result<(), FeatureError> {
        if row.len() == self.feature_names.len() {
            return Ok(());
        }
        Err(FeatureError::ScalerRejected {
            field: format!(
                "row of {} values (scaler expects {})",
                row.len(),
                self.feature_names.len()
            ),
            value: f64::NAN,
        })
    }
}
