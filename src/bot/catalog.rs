//! Ordered image catalog loaded once at startup.

use crate::collab::line_file::non_blank_lines;
use crate::config::ConfigError;
use std::path::Path;
use std::sync::Arc;

/// Immutable, ordered list of image locators
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    locators: Arc<[String]>,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl ImageCatalog {
    /// Build a catalog from locators in order
    pub fn new<I, S>(locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locators: locators.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a catalog file, one locator per line, blank lines skipped
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Catalog` if the file cannot be read.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Catalog {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(non_blank_lines(&content)))
    }

    /// Number of locators
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Whether the catalog has no locators
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Locator at `position`, if in range
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&str> {
        self.locators.get(position).map(String::as_str)
    }
}
