//! File-backed random locator source.

use super::line_file::LineFile;
use super::{CollaboratorError, UrlSource};
use async_trait::async_trait;
use std::path::PathBuf;

/// Picks a random locator from a text file, one URL per line
pub struct FileUrlSource {
    file: LineFile,
}

impl FileUrlSource {
    /// Create a source reading `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: LineFile::new(path),
        }
    }
}

#[async_trait]
impl UrlSource for FileUrlSource {
    async fn random_url(&self) -> Result<String, CollaboratorError> {
        self.file.pick().await
    }
}
