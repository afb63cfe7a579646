//! Raw input record collected by the form.

use crate::error::FeatureError;
use crate::types::catalog::ProductCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Source column names, as the model was trained on them.
pub mod columns {
    pub const PRODUCT: &str = "EnglishProductName";
    pub const CATEGORY: &str = "Category";
    pub const SUBCATEGORY: &str = "Subcategory";
    pub const COLOR: &str = "Color";
    pub const SIZE: &str = "Size";
    pub const LIST_PRICE: &str = "ListPrice";
    pub const MARGIN: &str = "Margin";
    pub const CALENDAR_YEAR: &str = "CalendarYear";
    pub const MONTH: &str = "MonthNumberOfYear";
    pub const HOLIDAY_SEASON: &str = "Is_Holiday_Season";
    pub const PRODUCT_AGE: &str = "Product_Age_Months";
    pub const PRIOR_DISCOUNT: &str = "descuento_promedio_mes_anterior";

    /// Columns passed through the fitted scaler, in scaler order.
    pub const SCALED: [&str; 2] = [LIST_PRICE, MARGIN];
}

pub const CALENDAR_YEARS: RangeInclusive<i32> = 2018..=2025;
pub const MONTHS: RangeInclusive<u32> = 1..=12;
pub const LIST_PRICE_RANGE: RangeInclusive<f64> = 0.0..=4000.0;
pub const MARGIN_RANGE: RangeInclusive<f64> = 0.0..=1500.0;
pub const PRODUCT_AGE_RANGE: RangeInclusive<u32> = 0..=150;
pub const DISCOUNT_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Declares a closed categorical field whose labels double as one-hot suffixes.
macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident => $field:expr,
        { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Source column this field is encoded from.
            pub const FIELD: &'static str = $field;

            /// Every level, in form order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Label exactly as it appeared in the training data.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Every label, in form order.
            pub fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.label()).collect()
            }
        }

        impl FromStr for $name {
            type Err = FeatureError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(FeatureError::UnknownCategory {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical! {
    /// Product category.
    Category => columns::CATEGORY,
    {
        Accessories => "Accessories",
        Clothing => "Clothing",
        Bikes => "Bikes",
    }
}

categorical! {
    /// Product subcategory. Multi-word labels keep their surrounding quotes.
    Subcategory => columns::SUBCATEGORY,
    {
        Helmets => "Helmets",
        Caps => "Caps",
        Jerseys => "Jerseys",
        RoadBikes => "'Road Bikes'",
        MountainBikes => "'Mountain Bikes'",
        Gloves => "Gloves",
        Vests => "Vests",
        Shorts => "Shorts",
        BottlesAndCages => "'Bottles and Cages'",
        TiresAndTubes => "'Tires and Tubes'",
        Socks => "Socks",
        BikeRacks => "'Bike Racks'",
        Cleaners => "Cleaners",
        Fenders => "Fenders",
        BikeStands => "'Bike Stands'",
        HydrationPacks => "'Hydration Packs'",
        TouringBikes => "'Touring Bikes'",
    }
}

categorical! {
    /// Product color; `nan` marks products without one.
    Color => columns::COLOR,
    {
        Red => "Red",
        Black => "Black",
        Blue => "Blue",
        Multi => "Multi",
        Silver => "Silver",
        Yellow => "Yellow",
        White => "White",
        Nan => "nan",
    }
}

categorical! {
    /// Product size; `nan` marks unsized products.
    Size => columns::SIZE,
    {
        Nan => "nan",
        S => "S",
        M => "M",
        L => "L",
        Xl => "XL",
        Size62 => "62",
        Size44 => "44",
        Size48 => "48",
        Size52 => "52",
        Size56 => "56",
        Size58 => "58",
        Size60 => "60",
        Size38 => "38",
        Size42 => "42",
        Size46 => "46",
        Size40 => "40",
        Size70 => "70",
        Size50 => "50",
        Size54 => "54",
    }
}

/// One observation to predict demand for.
///
/// Accepts both the snake_case field names and the training column names
/// when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(alias = "EnglishProductName")]
    pub product: String,

    #[serde(alias = "Category")]
    pub category: Category,

    #[serde(alias = "Subcategory")]
    pub subcategory: Subcategory,

    #[serde(alias = "Color")]
    pub color: Color,

    #[serde(alias = "Size")]
    pub size: Size,

    #[serde(alias = "CalendarYear")]
    pub calendar_year: i32,

    /// Month of year, 1-12
    #[serde(alias = "MonthNumberOfYear")]
    pub month: u32,

    #[serde(alias = "Is_Holiday_Season")]
    pub holiday_season: bool,

    /// List price in dollars
    #[serde(alias = "ListPrice")]
    pub list_price: f64,

    /// Margin in dollars
    #[serde(alias = "Margin")]
    pub margin: f64,

    #[serde(alias = "Product_Age_Months")]
    pub product_age_months: u32,

    /// Average discount of the previous month, as a fraction
    #[serde(alias = "descuento_promedio_mes_anterior")]
    pub prior_month_discount: f64,
}

impl RawRecord {
    /// Check every field against its enumerated set or range.
    pub fn validate(&self, catalog: &ProductCatalog) -> Result<(), FeatureError> {
        if !catalog.contains(&self.product) {
            return Err(FeatureError::UnknownCategory {
                field: columns::PRODUCT,
                value: self.product.clone(),
            });
        }

        check_range(
            columns::CALENDAR_YEAR,
            self.calendar_year as f64,
            *CALENDAR_YEARS.start() as f64,
            *CALENDAR_YEARS.end() as f64,
        )?;
        check_range(
            columns::MONTH,
            self.month as f64,
            *MONTHS.start() as f64,
            *MONTHS.end() as f64,
        )?;
        check_range(
            columns::LIST_PRICE,
            self.list_price,
            *LIST_PRICE_RANGE.start(),
            *LIST_PRICE_RANGE.end(),
        )?;
        check_range(
            columns::MARGIN,
            self.margin,
            *MARGIN_RANGE.start(),
            *MARGIN_RANGE.end(),
        )?;
        check_range(
            columns::PRODUCT_AGE,
            self.product_age_months as f64,
            *PRODUCT_AGE_RANGE.start() as f64,
            *PRODUCT_AGE_RANGE.end() as f64,
        )?;
        check_range(
            columns::PRIOR_DISCOUNT,
            self.prior_month_discount,
            *DISCOUNT_RANGE.start(),
            *DISCOUNT_RANGE.end(),
        )?;

        Ok(())
    }

    /// Field/value pairs in source column order, for display.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            (columns::PRODUCT, self.product.clone()),
            (columns::CATEGORY, self.category.to_string()),
            (columns::SUBCATEGORY, self.subcategory.to_string()),
            (columns::LIST_PRICE, format!("{}", self.list_price)),
            (columns::MARGIN, format!("{}", self.margin)),
            (columns::COLOR, self.color.to_string()),
            (columns::SIZE, self.size.to_string()),
            (columns::CALENDAR_YEAR, self.calendar_year.to_string()),
            (columns::MONTH, self.month.to_string()),
            (columns::HOLIDAY_SEASON, self.holiday_season.to_string()),
            (columns::PRODUCT_AGE, self.product_age_months.to_string()),
            (columns::PRIOR_DISCOUNT, format!("{}", self.prior_month_discount)),
        ]
    }
}

// NaN fails both comparisons, so non-finite input is rejected here too.
fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), FeatureError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(FeatureError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
