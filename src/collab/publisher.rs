//! Image service uploader.
//!
//! Posts raw JPEG bytes to the image service and returns the hosted
//! `picture_url` from its response.

use super::http_utils::{create_http_client, expect_status, network_error};
use super::{CollaboratorError, ImagePublisher};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Header carrying the publishing credential
pub const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

#[derive(Deserialize)]
struct ImagePayload {
    picture_url: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    payload: ImagePayload,
}

/// Uploads images to an image service endpoint
pub struct ImageServicePublisher {
    http_client: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl ImageServicePublisher {
    /// Create a publisher posting to `endpoint`
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: create_http_client(timeout),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ImagePublisher for ImageServicePublisher {
    async fn upload(
        &self,
        image_path: &Path,
        access_token: &str,
    ) -> Result<String, CollaboratorError> {
        let bytes = tokio::fs::read(image_path).await?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "image/jpeg")
            .header(ACCESS_TOKEN_HEADER, access_token)
            .body(bytes)
            .send()
            .await
            .map_err(|e| network_error(&e, self.timeout))?;

        let response = expect_status(response, &[200]).await?;

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Json(e.to_string()))?;

        Ok(parsed.payload.picture_url)
    }
}
