//! HTTP utilities for the default collaborators
//!
//! Provides common client construction and response checking so the
//! downloader, publisher and sender report failures the same way.

use super::CollaboratorError;
use reqwest::{Client as HttpClient, Response};
use std::time::Duration;

/// Longest response body kept in an error message
const MAX_ERROR_BODY_LEN: usize = 500;

/// Creates an HTTP client with the given request timeout.
///
/// This prevents infinite hangs when a remote is slow or unresponsive.
#[must_use]
pub fn create_http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// Maps a transport error to a collaborator error, keeping timeouts distinct.
#[must_use]
pub fn network_error(err: &reqwest::Error, timeout: Duration) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout { elapsed: timeout }
    } else {
        CollaboratorError::Network(err.to_string())
    }
}

/// Returns the response if its status is one of `accepted`, otherwise an error
/// carrying the status and a cleaned-up body.
///
/// # Errors
///
/// Returns `CollaboratorError::Status` when the status is not accepted.
pub async fn expect_status(
    response: Response,
    accepted: &[u16],
) -> Result<Response, CollaboratorError> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Status {
        status,
        body: clean_error_body(&error_text),
    })
}

/// Shortens an error body for logging.
///
/// HTML error pages from proxies are replaced by a marker, long bodies are
/// truncated on a char boundary.
#[must_use]
pub fn clean_error_body(body: &str) -> String {
    let trimmed = body.trim_start();
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        return "(server returned HTML error page)".to_string();
    }

    if body.len() > MAX_ERROR_BODY_LEN {
        let mut end = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}
