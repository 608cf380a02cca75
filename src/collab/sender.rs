//! Bot message sender.

use super::http_utils::{create_http_client, expect_status, network_error};
use super::{CollaboratorError, MessageSender};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;

/// Attachment entry of a bot post
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Attachment<'a> {
    /// Attachment kind, always `image` here
    #[serde(rename = "type")]
    pub kind: &'a str,
    /// Hosted image locator
    pub url: &'a str,
}

/// Body of a bot post
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BotPost<'a> {
    /// Bot identifier
    pub bot_id: &'a str,
    /// Message text
    pub text: &'a str,
    /// Attached media
    pub attachments: Vec<Attachment<'a>>,
}

impl<'a> BotPost<'a> {
    /// Build a post with a single image attachment
    #[must_use]
    pub fn with_image(bot_id: &'a str, text: &'a str, image_url: &'a str) -> Self {
        Self {
            bot_id,
            text,
            attachments: vec![Attachment {
                kind: "image",
                url: image_url,
            }],
        }
    }
}

/// Posts messages through the bot post endpoint
pub struct BotPostSender {
    http_client: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl BotPostSender {
    /// Create a sender posting to `endpoint`
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
impl MessageSender for BotPostSender {
    async fn send(
        &self,
        image_url: &str,
        text: &str,
        bot_id: &str,
    ) -> Result<(), CollaboratorError> {
        let post = BotPost::with_image(bot_id, text, image_url);

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&post)
            .send()
            .await
            .map_err(|e| network_error(&e, self.timeout))?;

        expect_status(response, &[200, 202]).await?;
        Ok(())
    }
}
