//! Configuration management for the demand forecast form

use crate::feature_preparer::indicator_column;
use crate::models::loader::ModelBundle;
use crate::types::catalog::ProductCatalog;
use crate::types::record::columns;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub artifact: ArtifactConfig,
    pub catalog: CatalogConfig,
    pub form: FormConfig,
    pub logging: LoggingConfig,
}

/// Model bundle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Path to the serialized bundle
    pub path: PathBuf,
    /// Intra-op threads for ONNX predictors
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Product catalog source. Takes the first of: file, explicit list, bundle columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Explicit product names
    #[serde(default)]
    pub products: Vec<String>,
    /// File with one product name per line
    #[serde(default)]
    pub products_file: Option<PathBuf>,
}

/// Form behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Show the input row and prepared row after each prediction
    pub show_details: bool,
    /// Number of leading prepared columns shown in details
    pub preview_columns: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration: defaults, then the file if present, then `DEMAND__*` variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults =
            Config::try_from(&AppConfig::default()).context("Failed to encode default configuration")?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("DEMAND").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => bail!("Unknown log format '{}' (expected json or pretty)", other),
        }
        if self.artifact.path.as_os_str().is_empty() {
            bail!("artifact.path must not be empty");
        }
        Ok(())
    }

    /// Resolve the product catalog for a loaded bundle
    pub fn resolve_catalog(&self, bundle: &ModelBundle) -> Result<ProductCatalog> {
        let catalog = if let Some(file) = &self.catalog.products_file {
            ProductCatalog::from_file(file)?
        } else if !self.catalog.products.is_empty() {
            ProductCatalog::new(self.catalog.products.iter().cloned())
        } else {
            ProductCatalog::from_columns(bundle.columns())
        };

        if catalog.is_empty() {
            bail!("Product catalog is empty: configure catalog.products or catalog.products_file");
        }

        // Every product needs its indicator column in the bundle.
        let known: HashSet<&str> = bundle.columns().iter().map(String::as_str).collect();
        let unknown: Vec<&str> = catalog
            .products()
            .iter()
            .filter(|p| !known.contains(indicator_column(columns::PRODUCT, p).as_str()))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            bail!(
                "Product catalog lists {} product(s) the model was not trained on: {:?}",
                unknown.len(),
                unknown
            );
        }
        Ok(catalog)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifact: ArtifactConfig {
                path: PathBuf::from("models/demand-bundle.json"),
                onnx_threads: 1,
            },
            catalog: CatalogConfig::default(),
            form: FormConfig {
                show_details: true,
                preview_columns: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
