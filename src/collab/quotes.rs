//! File-backed caption source.

use super::line_file::LineFile;
use super::{CollaboratorError, QuoteSource};
use async_trait::async_trait;
use std::path::PathBuf;

/// Picks a random quote from a text file, one quote per line
pub struct FileQuoteSource {
    file: LineFile,
}

impl FileQuoteSource {
    /// Create a source reading `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LineFile::new(path),
        }
    }
}

#[async_trait]
impl QuoteSource for FileQuoteSource {
    async fn random_quote(&self) -> Result<String, CollaboratorError> {
        self.file.pick().await
    }
}
