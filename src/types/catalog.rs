//! Product catalog: the set of product names the form offers.

use crate::types::record::columns;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Ordered, de-duplicated list of valid product names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCatalog {
    products: Vec<String>,
    index: HashSet<String>,
}

impl ProductCatalog {
    /// Build a catalog from names, keeping first-seen order and skipping blanks.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for name in names {
            let name: String = name.into();
            catalog.insert(name.trim());
        }
        catalog
    }

    /// Derive the catalog from the product indicator columns of a bundle.
    ///
    /// Names are kept verbatim so each one maps back to its column.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let prefix = format!("{}_", columns::PRODUCT);
        let mut catalog = Self::default();
        for column in columns {
            if let Some(name) = column.as_ref().strip_prefix(prefix.as_str()) {
                catalog.insert(name);
            }
        }
        catalog
    }

    fn insert(&mut self, name: &str) {
        if name.is_empty() || self.index.contains(name) {
            return;
        }
        self.index.insert(name.to_string());
        self.products.push(name.to_string());
    }

    /// Read one product name per line; `#` starts a comment line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read product catalog {}", path.display()))?;

        Ok(Self::new(
            contents
                .lines()
                .filter(|line| !line.trim_start().starts_with('#'))
                .map(str::to_string),
        ))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
