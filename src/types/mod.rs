//! Type definitions for the demand forecast form

pub mod catalog;
pub mod prediction;
pub mod record;

pub use catalog::ProductCatalog;
pub use prediction::PredictionResult;
pub use record::{Category, Color, RawRecord, Size, Subcategory};
