//! Feature preparation for demand model inference.
//!
//! Turns one [`RawRecord`] into the numeric row the predictor was trained on:
//! scale price and margin with the fitted scaler, coerce the holiday flag,
//! one-hot encode the categorical fields, then align to the canonical columns.

use crate::error::FeatureError;
use crate::models::loader::ModelBundle;
use crate::models::scaler::MinMaxScaler;
use crate::types::catalog::ProductCatalog;
use crate::types::record::{columns, Category, Color, RawRecord, Size, Subcategory};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Fields expanded into `<field>_<value>` indicator columns, in encoding order.
pub const CATEGORICAL_FIELDS: [&str; 5] = [
    columns::PRODUCT,
    Category::FIELD,
    Subcategory::FIELD,
    Color::FIELD,
    Size::FIELD,
];

/// Name of the indicator column for one categorical level.
pub fn indicator_column(field: &str, value: &str) -> String {
    format!("{}_{}", field, value)
}

/// One row aligned to the canonical column list.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector<'a> {
    columns: &'a [String],
    values: Vec<f64>,
}

impl<'a> FeatureVector<'a> {
    /// Pair column names with values without any alignment.
    pub fn from_parts(columns: &'a [String], values: Vec<f64>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i).copied())
    }

    /// First `head` columns, followed by every other active indicator column.
    pub fn preview(&self, head: usize) -> Vec<(&'a str, f64)> {
        let prefixes: Vec<String> = CATEGORICAL_FIELDS.iter().map(|f| format!("{}_", f)).collect();

        self.columns
            .iter()
            .zip(&self.values)
            .enumerate()
            .filter(|(i, (name, value))| {
                *i < head
                    || (**value != 0.0 && prefixes.iter().any(|p| name.starts_with(p.as_str())))
            })
            .map(|(_, (name, value))| (name.as_str(), *value))
            .collect()
    }
}

/// Prepares raw records using a bundle's scaler and canonical columns.
///
/// Stateless: the same record always yields the same vector.
pub struct FeaturePreparer<'a> {
    columns: &'a [String],
    scaler: &'a MinMaxScaler,
    catalog: &'a ProductCatalog,
}

impl<'a> FeaturePreparer<'a> {
    pub fn new(bundle: &'a ModelBundle, catalog: &'a ProductCatalog) -> Self {
        Self {
            columns: bundle.columns(),
            scaler: bundle.scaler(),
            catalog,
        }
    }

    /// Prepare one record. The record itself is only read.
    pub fn prepare(&self, record: &RawRecord) -> Result<FeatureVector<'a>, FeatureError> {
        record.validate(self.catalog)?;

        let produced = self.encode(record)?;
        let vector = self.align(produced);

        debug!(
            product = %record.product,
            columns = vector.len(),
            active = vector.values().iter().filter(|v| **v != 0.0).count(),
            "Features prepared"
        );

        Ok(vector)
    }

    /// Scaled, coerced and one-hot encoded columns, before alignment.
    fn encode(&self, record: &RawRecord) -> Result<Vec<(String, f64)>, FeatureError> {
        let scaled = self
            .scaler
            .transform(&[record.list_price, record.margin])?;

        let mut produced = Vec::with_capacity(12);
        produced.push((columns::LIST_PRICE.to_string(), scaled[0]));
        produced.push((columns::MARGIN.to_string(), scaled[1]));
        produced.push((columns::CALENDAR_YEAR.to_string(), record.calendar_year as f64));
        produced.push((columns::MONTH.to_string(), record.month as f64));
        produced.push((
            columns::HOLIDAY_SEASON.to_string(),
            if record.holiday_season { 1.0 } else { 0.0 },
        ));
        produced.push((
            columns::PRODUCT_AGE.to_string(),
            record.product_age_months as f64,
        ));
        produced.push((
            columns::PRIOR_DISCOUNT.to_string(),
            record.prior_month_discount,
        ));

        // A single row only ever exhibits its own level of each field.
        let levels = [
            record.product.as_str(),
            record.category.label(),
            record.subcategory.label(),
            record.color.label(),
            record.size.label(),
        ];
        for (field, level) in CATEGORICAL_FIELDS.iter().zip(levels) {
            produced.push((indicator_column(field, level), 1.0));
        }

        Ok(produced)
    }

    /// Reindex onto the canonical columns: missing columns are zero, extra ones dropped.
    fn align(&self, produced: Vec<(String, f64)>) -> FeatureVector<'a> {
        let lookup: HashMap<&str, f64> = produced
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();

        let values: Vec<f64> = self
            .columns
            .iter()
            .map(|c| lookup.get(c.as_str()).copied().unwrap_or(0.0))
            .collect();

        for (name, _) in &produced {
            if !self.columns.iter().any(|c| c == name) {
                trace!(column = %name, "Dropping column unknown to the model");
            }
        }

        FeatureVector::from_parts(self.columns, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{road_750_record, sample_bundle, sample_catalog};

    #[test]
    fn test_columns_match_canonical_exactly() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let preparer = FeaturePreparer::new(&bundle, &catalog);

        let features = preparer.prepare(&road_750_record()).unwrap();

        assert_eq!(features.columns(), bundle.columns());
        assert_eq!(features.len(), bundle.columns().len());
    }

    #[test]
    fn test_prepare_is_bit_identical_across_calls() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let preparer = FeaturePreparer::new(&bundle, &catalog);
        let record = road_750_record();

        let first = preparer.prepare(&record).unwrap();
        let second = preparer.prepare(&record).unwrap();

        let bits = |v: &FeatureVector<'_>| v.values().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
        assert_eq!(record, road_750_record());
    }

    #[test]
    fn test_road_750_scenario() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let features = FeaturePreparer::new(&bundle, &catalog)
            .prepare(&road_750_record())
            .unwrap();

        let scaled = bundle.scaler().transform(&[750.0, 150.0]).unwrap();
        assert_eq!(features.get("ListPrice"), Some(scaled[0]));
        assert_eq!(features.get("Margin"), Some(scaled[1]));

        // Size_70 is not canonical in the sample bundle, so it has no value at all.
        let active_sizes: Vec<&str> = Size::ALL
            .iter()
            .filter(|s| features.get(&indicator_column("Size", s.label())) == Some(1.0))
            .map(|s| s.label())
            .collect();
        assert_eq!(active_sizes, vec!["52"]);
        for size in Size::ALL {
            let value = features.get(&indicator_column("Size", size.label()));
            assert!(matches!(value, None | Some(0.0) | Some(1.0)), "{:?}", size);
        }
        assert_eq!(features.get("Size_70"), None);

        assert_eq!(features.get("Category_Bikes"), Some(1.0));
        assert_eq!(features.get("Subcategory_'Road Bikes'"), Some(1.0));
        assert_eq!(features.get("Color_Black"), Some(1.0));
        assert_eq!(features.get("EnglishProductName_Road-750 Black, 52"), Some(1.0));
        assert_eq!(features.get("Is_Holiday_Season"), Some(0.0));
        assert_eq!(features.get("CalendarYear"), Some(2023.0));
        assert_eq!(features.get("descuento_promedio_mes_anterior"), Some(0.05));
    }

    #[test]
    fn test_scaled_values_invert_to_input() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let features = FeaturePreparer::new(&bundle, &catalog)
            .prepare(&road_750_record())
            .unwrap();

        let scaled = [features.get("ListPrice").unwrap(), features.get("Margin").unwrap()];
        let restored = bundle.scaler().inverse_transform(&scaled).unwrap();
        assert!((restored[0] - 750.0).abs() < 1e-9);
        assert!((restored[1] - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_boundaries_prepare() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let preparer = FeaturePreparer::new(&bundle, &catalog);

        for price in [0.0, 4000.0] {
            let mut record = road_750_record();
            record.list_price = price;
            assert!(preparer.prepare(&record).is_ok(), "price {}", price);
        }
    }

    #[test]
    fn test_level_missing_from_model_is_dropped() {
        // "Size_70" is not a canonical column in the sample bundle.
        let bundle = sample_bundle();
        assert!(!bundle.columns().iter().any(|c| c == "Size_70"));

        let catalog = sample_catalog();
        let mut record = road_750_record();
        record.size = Size::Size70;

        let features = FeaturePreparer::new(&bundle, &catalog).prepare(&record).unwrap();
        assert_eq!(features.columns(), bundle.columns());
        assert_eq!(features.get("Size_70"), None);
        assert!(Size::ALL
            .iter()
            .filter_map(|s| features.get(&indicator_column("Size", s.label())))
            .all(|v| v == 0.0));
    }

    #[test]
    fn test_holiday_flag_encodes_as_one() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let mut record = road_750_record();
        record.holiday_season = true;

        let features = FeaturePreparer::new(&bundle, &catalog).prepare(&record).unwrap();
        assert_eq!(features.get("Is_Holiday_Season"), Some(1.0));
    }

    #[test]
    fn test_out_of_catalog_product_is_an_error() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let mut record = road_750_record();
        record.product = "Tandem-900".to_string();

        let err = FeaturePreparer::new(&bundle, &catalog)
            .prepare(&record)
            .unwrap_err();
        assert!(matches!(err, FeatureError::UnknownCategory { field: "EnglishProductName", .. }));
    }

    #[test]
    fn test_preview_keeps_head_and_active_indicators() {
        let bundle = sample_bundle();
        let catalog = sample_catalog();
        let features = FeaturePreparer::new(&bundle, &catalog)
            .prepare(&road_750_record())
            .unwrap();

        let preview = features.preview(3);
        let names: Vec<&str> = preview.iter().map(|(n, _)| *n).collect();

        let head: Vec<&str> = bundle.columns()[..3].iter().map(String::as_str).collect();
        assert_eq!(&names[..3], head.as_slice());
        assert!(names.contains(&"Size_52"));
        assert!(names.contains(&"Category_Bikes"));
        assert!(!names.contains(&"Size_S"));
    }
}
