//! Final-stage aggregation of base learner predictions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_weight() -> f64 {
    0.1
}

/// How the stack turns base predictions into one demand estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FinalEstimator {
    /// Linear meta-learner over base predictions (then passthrough features)
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Plain average of base predictions
    Mean,
    /// Median of base predictions
    Median,
    /// Weighted average, weights normalized over the estimators present
    Weighted {
        weights: HashMap<String, f64>,
        /// Weight for estimators not listed in `weights`
        #[serde(default = "default_weight")]
        default_weight: f64,
    },
}

impl FinalEstimator {
    /// Combine base predictions; `passthrough` is empty unless the stack passes features through.
    pub fn aggregate(&self, base: &[(&str, f64)], passthrough: &[f64]) -> f64 {
        match self {
            FinalEstimator::Linear {
                coefficients,
                intercept,
            } => {
                let inputs = base.iter().map(|(_, p)| *p).chain(passthrough.iter().copied());
                coefficients.iter().zip(inputs).map(|(c, x)| c * x).sum::<f64>() + intercept
            }
            FinalEstimator::Mean => {
                base.iter().map(|(_, p)| p).sum::<f64>() / base.len() as f64
            }
            FinalEstimator::Median => median(base.iter().map(|(_, p)| *p).collect()),
            FinalEstimator::Weighted {
                weights,
                default_weight,
            } => {
                let mut weighted_sum = 0.0;
                let mut total_weight = 0.0;

                for (name, prediction) in base {
                    let weight = weights.get(*name).copied().unwrap_or(*default_weight);
                    weighted_sum += prediction * weight;
                    total_weight += weight;
                }

                weighted_sum / total_weight
            }
        }
    }

    /// Check the estimator against the stack it will aggregate.
    pub(crate) fn validate(&self, estimators: &[&str], passthrough: usize) -> Result<(), String> {
        match self {
            FinalEstimator::Linear {
                coefficients,
                intercept,
            } => {
                let expected = estimators.len() + passthrough;
                if coefficients.len() != expected {
                    return Err(format!(
                        "{} coefficients for {} inputs",
                        coefficients.len(),
                        expected
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("non-finite coefficients".to_string());
                }
                Ok(())
            }
            FinalEstimator::Mean | FinalEstimator::Median => Ok(()),
            FinalEstimator::Weighted {
                weights,
                default_weight,
            } => {
                if let Some(unknown) = weights.keys().find(|k| !estimators.contains(&k.as_str())) {
                    return Err(format!("weight given for unknown estimator '{}'", unknown));
                }
                let total: f64 = estimators
                    .iter()
                    .map(|name| weights.get(*name).copied().unwrap_or(*default_weight))
                    .sum();
                if !(total.is_finite() && total > 0.0) {
                    return Err(format!("weights sum to {}", total));
                }
                Ok(())
            }
        }
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
