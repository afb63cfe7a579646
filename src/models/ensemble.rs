//! Stacking regression ensemble evaluated natively from the bundle.

use crate::error::{ArtifactError, PredictionError};
use crate::models::aggregator::FinalEstimator;
use crate::models::inference::Predictor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One node of a regression tree.
///
/// Split nodes send a row left when `x[feature] <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree stored as a flat node array rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Children must point forward, which also rules out cycles.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(format!("leaf {} has non-finite value", i));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            i, feature, n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", i));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// A base learner of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    Tree(RegressionTree),
    /// Mean of the member trees
    Forest { trees: Vec<RegressionTree> },
    /// `init + learning_rate * sum(trees)`
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    },
}

impl Estimator {
    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Estimator::Linear {
                coefficients,
                intercept,
            } => dot(coefficients, features) + intercept,
            Estimator::Tree(tree) => tree.predict(features),
            Estimator::Forest { trees } => {
                trees.iter().map(|t| t.predict(features)).sum::<f64>() / trees.len() as f64
            }
            Estimator::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => init + learning_rate * trees.iter().map(|t| t.predict(features)).sum::<f64>(),
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            Estimator::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != n_features {
                    return Err(format!(
                        "linear model has {} coefficients for {} features",
                        coefficients.len(),
                        n_features
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear model has non-finite parameters".to_string());
                }
                Ok(())
            }
            Estimator::Tree(tree) => tree.validate(n_features),
            Estimator::Forest { trees } => {
                if trees.is_empty() {
                    return Err("forest has no trees".to_string());
                }
                trees.iter().try_for_each(|t| t.validate(n_features))
            }
            Estimator::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => {
                if !init.is_finite() || !learning_rate.is_finite() {
                    return Err("gradient boosting has non-finite parameters".to_string());
                }
                trees.iter().try_for_each(|t| t.validate(n_features))
            }
        }
    }
}

/// Named base learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEstimator {
    pub name: String,
    pub model: Estimator,
}

/// Serialized stacking ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingSpec {
    /// Width of the feature vector the stack was trained on
    pub n_features: usize,
    pub estimators: Vec<NamedEstimator>,
    pub final_estimator: FinalEstimator,
    /// Feed the original features to the final estimator after the base predictions
    #[serde(default)]
    pub passthrough: bool,
}

/// Stacking regressor: base learners combined by a final estimator.
#[derive(Debug, Clone)]
pub struct StackingEnsemble {
    spec: StackingSpec,
}

impl StackingEnsemble {
    /// Validate the structure once so prediction can index without checks.
    pub fn new(spec: StackingSpec) -> Result<Self, ArtifactError> {
        if spec.estimators.is_empty() {
            return Err(ArtifactError::Invalid(
                "stacking ensemble has no base estimators".to_string(),
            ));
        }
        for estimator in &spec.estimators {
            estimator.model.validate(spec.n_features).map_err(|e| {
                ArtifactError::Invalid(format!("estimator '{}': {}", estimator.name, e))
            })?;
        }

        let names: Vec<&str> = spec.estimators.iter().map(|e| e.name.as_str()).collect();
        let extra = if spec.passthrough { spec.n_features } else { 0 };
        spec.final_estimator
            .validate(&names, extra)
            .map_err(|e| ArtifactError::Invalid(format!("final estimator: {}", e)))?;

        Ok(Self { spec })
    }

    pub fn estimator_names(&self) -> Vec<&str> {
        self.spec.estimators.iter().map(|e| e.name.as_str()).collect()
    }

    /// Base learner predictions, in estimator order.
    pub fn base_predictions(&self, features: &[f64]) -> Vec<(&str, f64)> {
        self.spec
            .estimators
            .iter()
            .map(|e| (e.name.as_str(), e.model.predict(features)))
            .collect()
    }
}

impl Predictor for StackingEnsemble {
    fn name(&self) -> &str {
        "stacking"
    }

    fn n_features(&self) -> usize {
        self.spec.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, PredictionError> {
        if features.len() != self.spec.n_features {
            return Err(PredictionError::ShapeMismatch {
                expected: self.spec.n_features,
                actual: features.len(),
            });
        }

        let base = self.base_predictions(features);
        let passthrough: &[f64] = if self.spec.passthrough {
            features
        } else {
            &[][..]
        };
        let output = self.spec.final_estimator.aggregate(&base, passthrough);

        debug!(base_predictions = ?base, output = output, "Stacking ensemble evaluated");

        Ok(output)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x0 <= 0.5 ? (x1 <= 10 ? 1 : 2) : 3
    fn small_tree() -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 4,
                },
                TreeNode::Split {
                    feature: 1,
                    threshold: 10.0,
                    left: 2,
                    right: 3,
                },
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Leaf { value: 2.0 },
                TreeNode::Leaf { value: 3.0 },
            ],
        }
    }

    #[test]
    fn test_tree_traversal() {
        let tree = small_tree();
        assert_eq!(tree.predict(&[0.5, 10.0]), 1.0);
        assert_eq!(tree.predict(&[0.2, 11.0]), 2.0);
        assert_eq!(tree.predict(&[0.9, 0.0]), 3.0);
    }

    #[test]
    fn test_tree_node_json_shapes() {
        let json = r#"{"nodes":[{"feature":0,"threshold":1.5,"left":1,"right":2},{"value":4.0},{"value":8.0}]}"#;
        let tree: RegressionTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.predict(&[1.0]), 4.0);
        assert_eq!(tree.predict(&[2.0]), 8.0);
    }

    #[test]
    fn test_forest_and_boosting() {
        let forest = Estimator::Forest {
            trees: vec![small_tree(), RegressionTree { nodes: vec![TreeNode::Leaf { value: 5.0 }] }],
        };
        assert_eq!(forest.predict(&[0.9, 0.0]), 4.0);

        let boosting = Estimator::GradientBoosting {
            init: 10.0,
            learning_rate: 0.5,
            trees: vec![small_tree(), small_tree()],
        };
        assert_eq!(boosting.predict(&[0.9, 0.0]), 13.0);
    }

    #[test]
    fn test_backward_child_rejected() {
        let tree = RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { value: 1.0 },
            ],
        };
        assert!(tree.validate(1).is_err());
    }

    #[test]
    fn test_feature_index_out_of_range_rejected() {
        let spec = StackingSpec {
            n_features: 1,
            estimators: vec![NamedEstimator {
                name: "tree".to_string(),
                model: Estimator::Tree(small_tree()),
            }],
            final_estimator: FinalEstimator::Mean,
            passthrough: false,
        };
        assert!(StackingEnsemble::new(spec).is_err());
    }

    #[test]
    fn test_stack_with_linear_final_and_passthrough() {
        let spec = StackingSpec {
            n_features: 2,
            estimators: vec![
                NamedEstimator {
                    name: "tree".to_string(),
                    model: Estimator::Tree(small_tree()),
                },
                NamedEstimator {
                    name: "linear".to_string(),
                    model: Estimator::Linear {
                        coefficients: vec![2.0, 1.0],
                        intercept: 1.0,
                    },
                },
            ],
            final_estimator: FinalEstimator::Linear {
                coefficients: vec![1.0, 0.5, 0.0, 0.1],
                intercept: 2.0,
            },
            passthrough: true,
        };
        let stack = StackingEnsemble::new(spec).unwrap();

        // tree -> 3, linear -> 2*1 + 4 + 1 = 7; 2 + 3 + 3.5 + 0.4
        let output = stack.predict(&[1.0, 4.0]).unwrap();
        assert!((output - 8.9).abs() < 1e-12);
        assert_eq!(stack.estimator_names(), vec!["tree", "linear"]);
    }

    #[test]
    fn test_shape_mismatch() {
        let spec = StackingSpec {
            n_features: 2,
            estimators: vec![NamedEstimator {
                name: "tree".to_string(),
                model: Estimator::Tree(small_tree()),
            }],
            final_estimator: FinalEstimator::Mean,
            passthrough: false,
        };
        let stack = StackingEnsemble::new(spec).unwrap();
        assert_eq!(
            stack.predict(&[1.0]),
            Err(PredictionError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }
}
