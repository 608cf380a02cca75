//! Delivery pipeline.
//!
//! One recognized command runs select → download → publish → notify exactly
//! once. The caption is best-effort; every other stage short-circuits the
//! rest on failure. Nothing is retried.

use super::cursor::{Navigator, Selection, SelectionError};
use super::router::{Classification, CommandSet};
use crate::collab::{CollaboratorError, Collaborators};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Static configuration of the engine
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Recognized commands and advance aliases
    pub commands: CommandSet,
    /// Channel identifier messages are posted as
    pub bot_id: String,
    /// Publishing credential
    pub access_token: String,
    /// Directory for transient downloads
    pub artifact_dir: PathBuf,
    /// Timeout applied to every collaborator call
    pub timeout: Duration,
}

/// Pipeline step that talks to a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Random locator lookup
    UrlSource,
    /// Caption lookup
    Quote,
    /// Image download
    Download,
    /// Image upload
    Upload,
    /// Message post
    Send,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UrlSource => "url_source",
            Self::Quote => "quote",
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Send => "send",
        };
        f.write_str(name)
    }
}

/// Errors that abort a delivery
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No image could be selected
    #[error("Selection failed: {0}")]
    Selection(#[from] SelectionError),
    /// A collaborator call failed or timed out
    #[error("Stage {stage} failed: {source}")]
    Stage {
        /// Step that failed
        stage: Stage,
        /// Collaborator error
        #[source]
        source: CollaboratorError,
    },
}

impl PipelineError {
    /// Whether the same command could succeed if sent again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Selection(_) => false,
            Self::Stage { source, .. } => source.is_retryable(),
        }
    }
}

/// A completed delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Locator the image was downloaded from
    pub source_url: String,
    /// Public locator of the uploaded copy
    pub published_url: String,
    /// Caption sent with the image, possibly empty
    pub caption: String,
    /// Catalog position served, `None` for random-source picks
    pub position: Option<usize>,
}

/// Result of handling one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command; nothing was done
    Ignored,
    /// Image posted to the channel
    Delivered(Delivery),
}

/// Orchestrates command handling
pub struct BotEngine {
    config: BotConfig,
    navigator: Navigator,
    collaborators: Collaborators,
}

impl BotEngine {
    /// Create a new engine
    #[must_use]
    pub const fn new(config: BotConfig, navigator: Navigator, collaborators: Collaborators) -> Self {
        Self {
            config,
            navigator,
            collaborators,
        }
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Shared navigation state
    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Handle one inbound message.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if selection or any collaborator other than the
    /// caption source fails. Each failure is logged where it happens.
    pub async fn handle(&self, raw_message: &str) -> Result<Outcome, PipelineError> {
        let classification = self.config.commands.classify(raw_message);
        if classification == Classification::Unrecognized {
            debug!("Ignoring non-command message");
            return Ok(Outcome::Ignored);
        }

        info!(%classification, "Handling command");

        let (source_url, position) = self.select(classification).await?;
        let caption = self.caption().await;

        let artifact = self.artifact_path();
        let published = self.publish(&source_url, &artifact).await;
        remove_artifact(&artifact).await;
        let published_url = published?;

        self.guarded(
            Stage::Send,
            self.collaborators
                .sender
                .send(&published_url, &caption, &self.config.bot_id),
        )
        .await?;

        info!(
            source = %source_url,
            published = %published_url,
            position,
            "Message sent successfully"
        );

        Ok(Outcome::Delivered(Delivery {
            source_url,
            published_url,
            caption,
            position,
        }))
    }

    async fn select(
        &self,
        classification: Classification,
    ) -> Result<(String, Option<usize>), PipelineError> {
        let selection = self.navigator.select(classification).await.map_err(|e| {
            error!(%classification, "Image selection failed: {e}");
            PipelineError::from(e)
        })?;

        match selection {
            Selection::Catalog { locator, position } => Ok((locator, Some(position))),
            Selection::RandomSource => {
                let url = self
                    .guarded(Stage::UrlSource, self.collaborators.urls.random_url())
                    .await?;
                Ok((url, None))
            }
        }
    }

    /// Caption for the post; failures degrade to an empty caption
    async fn caption(&self) -> String {
        let quote = with_timeout(self.config.timeout, self.collaborators.quotes.random_quote());
        match quote.await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(stage = %Stage::Quote, "Caption unavailable, sending without one: {e}");
                String::new()
            }
        }
    }

    async fn publish(&self, source_url: &str, artifact: &Path) -> Result<String, PipelineError> {
        self.guarded(
            Stage::Download,
            self.collaborators.fetcher.download(source_url, artifact),
        )
        .await?;

        self.guarded(
            Stage::Upload,
            self.collaborators
                .publisher
                .upload(artifact, &self.config.access_token),
        )
        .await
    }

    /// Run a collaborator call under the timeout, logging any failure
    async fn guarded<T, F>(&self, stage: Stage, call: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        with_timeout(self.config.timeout, call).await.map_err(|source| {
            error!(
                %stage,
                retryable = source.is_retryable(),
                "Pipeline stage failed: {source}"
            );
            PipelineError::Stage { stage, source }
        })
    }

    fn artifact_path(&self) -> PathBuf {
        self.config
            .artifact_dir
            .join(format!("calvin-{}.jpg", Uuid::new_v4()))
    }
}

async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(CollaboratorError::Timeout { elapsed: timeout }))
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove artifact: {e}"),
    }
}
