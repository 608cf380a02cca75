//! Random line picker over plain text files.
//!
//! Both the locator list and the quote list are one entry per line. The file
//! is re-read on every pick so edits take effect without a restart.

use super::CollaboratorError;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// A text file read as a list of non-blank lines
#[derive(Debug, Clone)]
pub struct LineFile {
    path: PathBuf,
}

impl LineFile {
    /// Create a picker over `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and return one non-blank line at random
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError::Io` if the file cannot be read and
    /// `CollaboratorError::Empty` if it has no non-blank line.
    pub async fn pick(&self) -> Result<String, CollaboratorError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let lines = non_blank_lines(&content);
        choose(&lines).ok_or_else(|| CollaboratorError::Empty(self.path.display().to_string()))
    }
}

/// Trimmed, non-blank lines of `content`
#[must_use]
pub fn non_blank_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn choose(lines: &[String]) -> Option<String> {
    lines.choose(&mut rand::thread_rng()).cloned()
}
