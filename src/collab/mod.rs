//! Collaborator capabilities consumed by the bot engine.
//!
//! Each capability is a narrow async trait so the engine can be driven by
//! the default file/HTTP implementations in production and by stubs in tests.

/// HTTP image downloader
pub mod fetcher;
/// Shared HTTP helpers
pub mod http_utils;
/// Random line picker over text files
pub mod line_file;
/// Image service uploader
pub mod publisher;
/// Caption source
pub mod quotes;
/// Bot message sender
pub mod sender;
/// Random locator source
pub mod url_source;

pub use fetcher::HttpImageFetcher;
pub use publisher::ImageServicePublisher;
pub use quotes::FileQuoteSource;
pub use sender::BotPostSender;
pub use url_source::FileUrlSource;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by collaborators
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// Error during network communication
    #[error("Network error: {0}")]
    Network(String),
    /// Remote returned an unexpected status code
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },
    /// Local file error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("JSON error: {0}")]
    Json(String),
    /// The backing list had nothing to offer
    #[error("Source is empty: {0}")]
    Empty(String),
    /// The call did not finish within the configured timeout
    #[error("Timed out after {elapsed:?}")]
    Timeout {
        /// Timeout that elapsed
        elapsed: Duration,
    },
}

impl CollaboratorError {
    /// Whether trying the same request again could succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Io(_) | Self::Json(_) | Self::Empty(_) => false,
        }
    }
}

/// Source of random image locators, used when no catalog is loaded
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlSource: Send + Sync {
    /// Pick a random image locator
    async fn random_url(&self) -> Result<String, CollaboratorError>;
}

/// Downloads an image to a local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch `url` and write its body to `dest`
    async fn download(&self, url: &str, dest: &Path) -> Result<(), CollaboratorError>;
}

/// Source of caption text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Pick a random quote
    async fn random_quote(&self) -> Result<String, CollaboratorError>;
}

/// Publishes a local image and returns a public locator for it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImagePublisher: Send + Sync {
    /// Upload the image at `image_path` using `access_token`
    async fn upload(&self, image_path: &Path, access_token: &str)
        -> Result<String, CollaboratorError>;
}

/// Posts a message with an image attachment to a channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `text` with `image_url` attached as bot `bot_id`
    async fn send(&self, image_url: &str, text: &str, bot_id: &str)
        -> Result<(), CollaboratorError>;
}

/// Handles to every collaborator the engine drives
#[derive(Clone)]
pub struct Collaborators {
    /// Random locator source
    pub urls: Arc<dyn UrlSource>,
    /// Image downloader
    pub fetcher: Arc<dyn ImageFetcher>,
    /// Caption source
    pub quotes: Arc<dyn QuoteSource>,
    /// Image uploader
    pub publisher: Arc<dyn ImagePublisher>,
    /// Message sender
    pub sender: Arc<dyn MessageSender>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = CollaboratorError::Timeout {
            elapsed: Duration::from_millis(250),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.to_string(), "Timed out after 250ms");
        assert!(CollaboratorError::Network("reset".into()).is_retryable());
        assert!(CollaboratorError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(CollaboratorError::Status {
            status: 429,
            body: String::new()
        }
        .is_retryable());

        assert!(!CollaboratorError::Status {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!CollaboratorError::Empty("url.txt".into()).is_retryable());
        assert!(!CollaboratorError::Json("eof".into()).is_retryable());
    }
}
