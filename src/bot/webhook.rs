//! Webhook receiver for chat callbacks.
//!
//! The chat service POSTs every group message to the callback URL. The handler
//! acknowledges immediately and runs the pipeline on its own task, so the
//! caller never waits for downloads or uploads and never sees their errors.
//! Those tasks are tracked and drained when the server shuts down.

use super::engine::{BotEngine, Outcome};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Path the chat service posts callbacks to
pub const CALLBACK_PATH: &str = "/callback";
/// Liveness check path
pub const HEALTH_PATH: &str = "/health";

/// A message delivered by the callback.
///
/// Only `text` drives the bot; the rest is accepted so full payloads parse.
#[derive(Debug, Clone, Deserialize)]
pub struct BotCommand {
    /// Message text
    #[serde(rename = "text")]
    pub message: String,
    /// Sender display name
    pub name: Option<String>,
    /// Sender avatar
    pub avatar_url: Option<String>,
    /// Unix timestamp of the message
    pub created_at: Option<i64>,
    /// Group the message was posted in
    pub group_id: Option<String>,
    /// Message identifier
    pub id: Option<String>,
    /// Sender identifier
    pub sender_id: Option<String>,
    /// `user`, `bot` or `system`
    pub sender_type: Option<String>,
    /// Client-side message identifier
    pub source_guid: Option<String>,
    /// Whether the message was generated by the service
    pub system: Option<bool>,
    /// Sender user identifier
    pub user_id: Option<String>,
}

/// Pipelines started by callbacks that may still be running
#[derive(Clone, Default)]
pub struct Deliveries {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Deliveries {
    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `engine` on `message` in the background
    pub fn spawn(&self, engine: Arc<BotEngine>, message: String) {
        let mut tasks = self.lock();
        // Reap finished pipelines so the set only holds running ones
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            match engine.handle(&message).await {
                Ok(Outcome::Delivered(delivery)) => {
                    debug!(published = %delivery.published_url, "Callback handled");
                }
                Ok(Outcome::Ignored) => {}
                Err(e) => error!(retryable = e.is_retryable(), "Callback failed: {e}"),
            }
        });
    }

    /// Number of pipelines not yet reaped
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no pipeline is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for every tracked pipeline to finish
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.lock());
        if !tasks.is_empty() {
            info!("Waiting for {} in-flight deliveries", tasks.len());
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Delivery task ended abnormally: {e}");
            }
        }
    }
}

#[derive(Clone)]
struct WebhookState {
    engine: Arc<BotEngine>,
    deliveries: Deliveries,
}

/// Build the webhook router, spawning pipelines into `deliveries`
pub fn router(engine: Arc<BotEngine>, deliveries: Deliveries) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(handle_callback))
        .route(HEALTH_PATH, get(health))
        .with_state(WebhookState { engine, deliveries })
}

/// Serve the webhook on `listener` until `shutdown` resolves, then wait for
/// deliveries that are still running.
///
/// # Errors
///
/// Returns an I/O error if the server fails.
pub async fn serve<S>(listener: TcpListener, engine: Arc<BotEngine>, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    info!("Webhook server listening on {}", listener.local_addr()?);
    let deliveries = Deliveries::default();
    let result = axum::serve(listener, router(engine, deliveries.clone()))
        .with_graceful_shutdown(shutdown)
        .await;
    deliveries.drain().await;
    result
}

/// Axum handler for incoming callback POST requests.
async fn handle_callback(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let command: BotCommand = match serde_json::from_slice(&body) {
        Ok(command) => command,
        Err(e) => {
            debug!("Dropping malformed callback body: {e}");
            return StatusCode::OK;
        }
    };

    state.deliveries.spawn(state.engine, command.message);
    StatusCode::OK
}

async fn health() -> &'static str {
    "ok"
}
