//! HTTP image downloader.

use super::http_utils::{create_http_client, expect_status, network_error};
use super::{CollaboratorError, ImageFetcher};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client as HttpClient;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Downloads images with a plain GET and streams the body to disk
pub struct HttpImageFetcher {
    http_client: HttpClient,
    timeout: Duration,
}

impl HttpImageFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: create_http_client(timeout),
            timeout,
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), CollaboratorError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&e, self.timeout))?;

        let response = expect_status(response, &[200]).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: usize = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network_error(&e, self.timeout))?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(url, bytes = written, dest = %dest.display(), "Image downloaded");
        Ok(())
    }
}
