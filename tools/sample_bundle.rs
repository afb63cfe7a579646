//! Sample Bundle Generator
//!
//! Writes a synthetic stacking-ensemble bundle so the form can be run
//! without a trained model. Predictions from it are plausible, not accurate.

use anyhow::Context;
use demand_forecast::feature_preparer::indicator_column;
use demand_forecast::models::aggregator::FinalEstimator;
use demand_forecast::models::ensemble::{
    Estimator, NamedEstimator, RegressionTree, StackingSpec, TreeNode,
};
use demand_forecast::models::loader::{ArtifactLoader, BundleFile, PredictorSpec, FORMAT_VERSION};
use demand_forecast::models::scaler::ScalerSpec;
use demand_forecast::types::record::{columns, Category, Color, Size, Subcategory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

const PRODUCTS: &[&str] = &[
    "Road-750 Black, 52",
    "Road-650 Red, 44",
    "Road-250 Black, 48",
    "Mountain-200 Silver, 38",
    "Mountain-100 Black, 42",
    "Touring-1000 Blue, 50",
    "Sport-100 Helmet, Red",
    "Long-Sleeve Logo Jersey, M",
    "Classic Vest, S",
    "Water Bottle - 30 oz.",
    "Patch Kit/8 Patches",
    "Road Bottle Cage",
];

/// Builds random trees and linear weights over the canonical columns.
struct SampleModelGenerator {
    rng: StdRng,
    columns: Vec<String>,
}

impl SampleModelGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            columns: canonical_columns(),
        }
    }

    fn position(&self, name: &str) -> usize {
        self.columns.iter().position(|c| c == name).unwrap_or(0)
    }

    /// Split threshold in the units the prepared column takes.
    fn threshold(&mut self, feature: usize) -> f64 {
        match self.columns[feature].as_str() {
            columns::LIST_PRICE | columns::MARGIN | columns::PRIOR_DISCOUNT => {
                self.rng.gen_range(0.05..0.95)
            }
            columns::CALENDAR_YEAR => self.rng.gen_range(2018..2025) as f64 + 0.5,
            columns::MONTH => self.rng.gen_range(1..12) as f64 + 0.5,
            columns::PRODUCT_AGE => self.rng.gen_range(0..150) as f64 + 0.5,
            // holiday flag and indicators
            _ => 0.5,
        }
    }

    fn tree(&mut self, depth: usize, leaves: std::ops::Range<f64>) -> RegressionTree {
        let mut nodes = Vec::new();
        self.grow(&mut nodes, depth, &leaves);
        RegressionTree { nodes }
    }

    // Preorder layout keeps every child index after its parent.
    fn grow(&mut self, nodes: &mut Vec<TreeNode>, depth: usize, leaves: &std::ops::Range<f64>) -> usize {
        let idx = nodes.len();
        if depth == 0 {
            nodes.push(TreeNode::Leaf {
                value: self.rng.gen_range(leaves.clone()),
            });
            return idx;
        }

        nodes.push(TreeNode::Leaf { value: 0.0 });
        let feature = self.rng.gen_range(0..self.columns.len());
        let threshold = self.threshold(feature);
        let left = self.grow(nodes, depth - 1, leaves);
        let right = self.grow(nodes, depth - 1, leaves);
        nodes[idx] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn linear(&mut self) -> Estimator {
        let mut coefficients: Vec<f64> = (0..self.columns.len())
            .map(|_| self.rng.gen_range(-1.5..1.5))
            .collect();

        coefficients[self.position(columns::LIST_PRICE)] = -12.0;
        coefficients[self.position(columns::HOLIDAY_SEASON)] = 9.0;
        coefficients[self.position(columns::PRIOR_DISCOUNT)] = 20.0;
        coefficients[self.position(columns::CALENDAR_YEAR)] = 0.0;
        coefficients[self.position(columns::PRODUCT_AGE)] = -0.05;

        Estimator::Linear {
            coefficients,
            intercept: 22.0,
        }
    }

    fn stacking(&mut self, n_trees: usize) -> StackingSpec {
        let forest = Estimator::Forest {
            trees: (0..n_trees).map(|_| self.tree(4, 5.0..60.0)).collect(),
        };
        let boosting = Estimator::GradientBoosting {
            init: 20.0,
            learning_rate: 0.1,
            trees: (0..n_trees).map(|_| self.tree(3, -8.0..8.0)).collect(),
        };
        let ridge = self.linear();

        StackingSpec {
            n_features: self.columns.len(),
            estimators: vec![
                NamedEstimator {
                    name: "rf".to_string(),
                    model: forest,
                },
                NamedEstimator {
                    name: "gbr".to_string(),
                    model: boosting,
                },
                NamedEstimator {
                    name: "ridge".to_string(),
                    model: ridge,
                },
            ],
            final_estimator: FinalEstimator::Linear {
                coefficients: vec![0.35, 0.4, 0.25],
                intercept: 0.0,
            },
            passthrough: false,
        }
    }

    fn bundle(mut self, n_trees: usize) -> BundleFile {
        let stacking = self.stacking(n_trees);
        BundleFile {
            format_version: FORMAT_VERSION,
            columns: self.columns,
            scaler: ScalerSpec {
                feature_names: columns::SCALED.iter().map(|c| c.to_string()).collect(),
                data_min: vec![2.29, 0.86],
                data_max: vec![3578.27, 1487.84],
                feature_range: [0.0, 1.0],
            },
            predictor: PredictorSpec::Stacking(stacking),
        }
    }
}

/// Numeric columns first, then one indicator per product and level.
fn canonical_columns() -> Vec<String> {
    let mut cols: Vec<String> = [
        columns::LIST_PRICE,
        columns::MARGIN,
        columns::CALENDAR_YEAR,
        columns::MONTH,
        columns::HOLIDAY_SEASON,
        columns::PRODUCT_AGE,
        columns::PRIOR_DISCOUNT,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    cols.extend(PRODUCTS.iter().map(|p| indicator_column(columns::PRODUCT, p)));
    for (field, labels) in [
        (Category::FIELD, Category::labels()),
        (Subcategory::FIELD, Subcategory::labels()),
        (Color::FIELD, Color::labels()),
        (Size::FIELD, Size::labels()),
    ] {
        cols.extend(labels.into_iter().map(|l| indicator_column(field, l)));
    }
    cols
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_bundle=info".parse()?),
        )
        .init();

    info!("Starting Sample Bundle Generator");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let output = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("models/demand-bundle.json");
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);
    let n_trees: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);

    info!(output = %output, seed = seed, trees = n_trees, "Configuration loaded");

    let bundle = SampleModelGenerator::new(seed).bundle(n_trees);
    let output = Path::new(output);

    // Refuse to write anything the loader would reject.
    let loaded = ArtifactLoader::new()
        .assemble(bundle.clone(), output.parent().unwrap_or(Path::new(".")))
        .context("Generated bundle failed validation")?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    std::fs::write(output, serde_json::to_string_pretty(&bundle)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        path = %output.display(),
        columns = loaded.columns().len(),
        products = PRODUCTS.len(),
        "Completed! Sample bundle written"
    );

    Ok(())
}
