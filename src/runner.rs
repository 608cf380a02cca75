//! Process wiring: builds the engine from settings and runs the webhook server.

use crate::bot::{
    webhook, BotConfig, BotEngine, CommandSet, ImageCatalog, NavigationPolicy, Navigator,
};
use crate::collab::{
    BotPostSender, Collaborators, FileQuoteSource, FileUrlSource, HttpImageFetcher,
    ImageServicePublisher,
};
use crate::config::{ConfigError, Settings};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Run the webhook server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the engine cannot be built, the port cannot be bound,
/// or the server fails.
pub async fn run_bot(settings: Settings) -> anyhow::Result<()> {
    let engine = Arc::new(build_engine(&settings).await?);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, settings.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Bot is running...");
    webhook::serve(listener, engine, shutdown_signal()).await?;
    info!("Webhook server stopped");
    Ok(())
}

/// Assemble the engine and its default collaborators.
///
/// # Errors
///
/// Returns a `ConfigError` if a credential is missing, the timeout is zero,
/// the artifact directory does not exist, the catalog cannot be read, or the
/// persisted cursor is unusable.
pub async fn build_engine(settings: &Settings) -> Result<BotEngine, ConfigError> {
    let config = BotConfig {
        commands: CommandSet::from_settings(settings),
        bot_id: settings.bot_id()?.to_string(),
        access_token: settings.access_token()?.to_string(),
        artifact_dir: settings.artifact_dir(),
        timeout: settings.collaborator_timeout(),
    };
    check_runtime_settings(&config).await?;

    let navigator = init_navigator(settings).await?;
    let collaborators = init_collaborators(settings);

    info!(
        "Engine initialized (catalog: {} images, timeout: {}s)",
        navigator.catalog().len(),
        settings.collaborator_timeout_secs
    );
    Ok(BotEngine::new(config, navigator, collaborators))
}

async fn check_runtime_settings(config: &BotConfig) -> Result<(), ConfigError> {
    if config.timeout.is_zero() {
        return Err(ConfigError::Invalid {
            key: "COLLABORATOR_TIMEOUT_SECS",
            reason: "must be at least 1 second".to_string(),
        });
    }

    let dir = &config.artifact_dir;
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ConfigError::Invalid {
            key: "ARTIFACT_DIR",
            reason: format!("{} is not a directory", dir.display()),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key: "ARTIFACT_DIR",
            reason: format!("{}: {e}", dir.display()),
        }),
    }
}

async fn init_navigator(settings: &Settings) -> Result<Navigator, ConfigError> {
    let catalog = match &settings.catalog_path {
        Some(path) => ImageCatalog::load(path).await?,
        None => {
            warn!("CATALOG_PATH not set, serving random images only");
            ImageCatalog::default()
        }
    };

    let navigator = Navigator::new(catalog, NavigationPolicy::from_wrap(settings.wrap_navigation));
    match &settings.cursor_state_path {
        Some(path) => navigator.with_state_file(path).await,
        None => Ok(navigator),
    }
}

fn init_collaborators(settings: &Settings) -> Collaborators {
    let timeout = settings.collaborator_timeout();
    Collaborators {
        urls: Arc::new(FileUrlSource::new(&settings.url_list_path)),
        fetcher: Arc::new(HttpImageFetcher::new(timeout)),
        quotes: Arc::new(FileQuoteSource::new(&settings.quotes_path)),
        publisher: Arc::new(ImageServicePublisher::new(
            settings.image_service_url.as_str(),
            timeout,
        )),
        sender: Arc::new(BotPostSender::new(settings.bot_post_url.as_str(), timeout)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
