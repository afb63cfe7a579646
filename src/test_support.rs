//! Shared fixtures for unit tests.

use crate::error::PredictionError;
use crate::feature_preparer::indicator_column;
use crate::models::aggregator::FinalEstimator;
use crate::models::ensemble::{Estimator, NamedEstimator, RegressionTree, StackingSpec, TreeNode};
use crate::models::inference::Predictor;
use crate::models::loader::{ArtifactLoader, BundleFile, ModelBundle, PredictorSpec, FORMAT_VERSION};
use crate::models::scaler::{MinMaxScaler, ScalerSpec};
use crate::types::catalog::ProductCatalog;
use crate::types::record::{columns, Category, Color, RawRecord, Size, Subcategory};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PRODUCTS: [&str; 4] = [
    "Road-750 Black, 52",
    "Mountain-200 Silver, 38",
    "Sport-100 Helmet, Red",
    "Water Bottle - 30 oz.",
];

pub fn sample_catalog() -> ProductCatalog {
    ProductCatalog::new(PRODUCTS)
}

/// Canonical columns: numeric fields, then every level except `Size_70`.
pub fn sample_columns() -> Vec<String> {
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
    cols.extend(Category::labels().into_iter().map(|l| indicator_column(Category::FIELD, l)));
    cols.extend(
        Subcategory::labels()
            .into_iter()
            .map(|l| indicator_column(Subcategory::FIELD, l)),
    );
    cols.extend(Color::labels().into_iter().map(|l| indicator_column(Color::FIELD, l)));
    cols.extend(
        Size::labels()
            .into_iter()
            .filter(|l| *l != "70")
            .map(|l| indicator_column(Size::FIELD, l)),
    );
    cols
}

pub fn sample_scaler_spec() -> ScalerSpec {
    ScalerSpec {
        feature_names: vec![columns::LIST_PRICE.to_string(), columns::MARGIN.to_string()],
        data_min: vec![2.29, 0.0],
        data_max: vec![3578.27, 1487.8],
        feature_range: [0.0, 1.0],
    }
}

fn position(cols: &[String], name: &str) -> usize {
    cols.iter().position(|c| c == name).unwrap()
}

/// Linear base learner plus a holiday-split tree, combined linearly.
pub fn sample_bundle_file() -> BundleFile {
    let cols = sample_columns();
    let n = cols.len();

    let mut coefficients = vec![0.0; n];
    coefficients[position(&cols, columns::LIST_PRICE)] = 10.0;
    coefficients[position(&cols, "Category_Bikes")] = 5.0;
    coefficients[position(&cols, "Size_52")] = 3.0;

    let holiday_split = RegressionTree {
        nodes: vec![
            TreeNode::Split {
                feature: position(&cols, columns::HOLIDAY_SEASON),
                threshold: 0.5,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 30.0 },
            TreeNode::Leaf { value: 45.0 },
        ],
    };

    BundleFile {
        format_version: FORMAT_VERSION,
        columns: cols,
        scaler: sample_scaler_spec(),
        predictor: PredictorSpec::Stacking(StackingSpec {
            n_features: n,
            estimators: vec![
                NamedEstimator {
                    name: "ridge".to_string(),
                    model: Estimator::Linear {
                        coefficients,
                        intercept: 20.0,
                    },
                },
                NamedEstimator {
                    name: "tree".to_string(),
                    model: Estimator::Tree(holiday_split),
                },
            ],
            final_estimator: FinalEstimator::Linear {
                coefficients: vec![0.6, 0.4],
                intercept: 0.0,
            },
            passthrough: false,
        }),
    }
}

pub fn sample_bundle() -> ModelBundle {
    ArtifactLoader::new()
        .assemble(sample_bundle_file(), Path::new("."))
        .unwrap()
}

pub fn bundle_with_predictor(predictor: Box<dyn Predictor>) -> ModelBundle {
    let scaler = MinMaxScaler::from_spec(&sample_scaler_spec()).unwrap();
    ModelBundle::new(predictor, sample_columns(), scaler).unwrap()
}

pub fn road_750_record() -> RawRecord {
    RawRecord {
        product: "Road-750 Black, 52".to_string(),
        category: Category::Bikes,
        subcategory: Subcategory::RoadBikes,
        color: Color::Black,
        size: Size::Size52,
        calendar_year: 2023,
        month: 6,
        holiday_season: false,
        list_price: 750.0,
        margin: 150.0,
        product_age_months: 12,
        prior_month_discount: 0.05,
    }
}

/// Predictor that fails a set number of times, then returns a fixed value.
pub struct FailingPredictor {
    n_features: usize,
    failures_left: AtomicUsize,
    value: f64,
}

impl FailingPredictor {
    pub fn always(n_features: usize) -> Self {
        Self::fail_first(n_features, usize::MAX, 0.0)
    }

    pub fn returning(n_features: usize, value: f64) -> Self {
        Self::fail_first(n_features, 0, value)
    }

    pub fn fail_first(n_features: usize, failures: usize, value: f64) -> Self {
        Self {
            n_features,
            failures_left: AtomicUsize::new(failures),
            value,
        }
    }
}

impl Predictor for FailingPredictor {
    fn name(&self) -> &str {
        "failing"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, _features: &[f64]) -> Result<f64, PredictionError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != usize::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return Err(PredictionError::Backend("internal model error".to_string()));
        }
        Ok(self.value)
    }
}
