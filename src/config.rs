//! Configuration and settings management
//!
//! Loads settings from environment variables and optional config files.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 8080;
/// Tokens that trigger the bot
pub const DEFAULT_COMMANDS: &str = "comic,!comic,calvin,!calvin,next,!next";
/// Tokens that advance through the catalog instead of picking at random
pub const DEFAULT_NEXT_COMMANDS: &str = "next,!next";
/// Random locator list used when no catalog is configured
pub const DEFAULT_URL_LIST_PATH: &str = "url.txt";
/// Caption list
pub const DEFAULT_QUOTES_PATH: &str = "quotes.txt";
/// Per-call timeout for collaborators
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 30;
/// GroupMe image service endpoint
pub const DEFAULT_IMAGE_SERVICE_URL: &str = "https://image.groupme.com/pictures";
/// GroupMe bot post endpoint
pub const DEFAULT_BOT_POST_URL: &str = "https://api.groupme.com/v3/bots/post";

/// Errors that prevent the bot from starting
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent or empty
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
    /// Error while merging configuration sources
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),
    /// The configured catalog file could not be read
    #[error("Failed to read catalog {path}: {source}")]
    Catalog {
        /// Catalog file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// A setting is present but unusable
    #[error("Invalid configuration {key}: {reason}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// What is wrong with it
        reason: String,
    },
    /// The persisted cursor could not be used
    #[error("Invalid cursor state: {0}")]
    CursorState(String),
}

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Bot identifier used when posting to the channel
    pub bot_id: Option<String>,
    /// Access token for the image service
    pub gm_token: Option<String>,

    /// Listen port for the webhook server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of recognized command tokens
    #[serde(rename = "bot_commands", default = "default_commands")]
    pub commands_str: String,
    /// Comma-separated list of tokens that advance the cursor
    #[serde(rename = "next_commands", default = "default_next_commands")]
    pub next_commands_str: String,

    /// Ordered list of image locators, one per line
    pub catalog_path: Option<PathBuf>,
    /// Locator list for random picks when the catalog is empty
    #[serde(default = "default_url_list_path")]
    pub url_list_path: PathBuf,
    /// Caption list
    #[serde(default = "default_quotes_path")]
    pub quotes_path: PathBuf,
    /// Directory for transient downloads
    pub artifact_dir: Option<PathBuf>,
    /// File the cursor is persisted to between restarts
    pub cursor_state_path: Option<PathBuf>,
    /// Loop back to the first image after the last one
    #[serde(default)]
    pub wrap_navigation: bool,

    /// Timeout applied to every collaborator call
    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,
    /// Image upload endpoint
    #[serde(default = "default_image_service_url")]
    pub image_service_url: String,
    /// Bot message endpoint
    #[serde(default = "default_bot_post_url")]
    pub bot_post_url: String,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_commands() -> String {
    DEFAULT_COMMANDS.to_string()
}

fn default_next_commands() -> String {
    DEFAULT_NEXT_COMMANDS.to_string()
}

fn default_url_list_path() -> PathBuf {
    PathBuf::from(DEFAULT_URL_LIST_PATH)
}

fn default_quotes_path() -> PathBuf {
    PathBuf::from(DEFAULT_QUOTES_PATH)
}

const fn default_collaborator_timeout_secs() -> u64 {
    DEFAULT_COLLABORATOR_TIMEOUT_SECS
}

fn default_image_service_url() -> String {
    DEFAULT_IMAGE_SERVICE_URL.to_string()
}

fn default_bot_post_url() -> String {
    DEFAULT_BOT_POST_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_id: None,
            gm_token: None,
            port: default_port(),
            commands_str: default_commands(),
            next_commands_str: default_next_commands(),
            catalog_path: None,
            url_list_path: default_url_list_path(),
            quotes_path: default_quotes_path(),
            artifact_dir: None,
            cursor_state_path: None,
            wrap_navigation: false,
            collaborator_timeout_secs: default_collaborator_timeout_secs(),
            image_service_url: default_image_service_url(),
            bot_post_url: default_bot_post_url(),
        }
    }
}

/// Build the layered configuration source.
///
/// # Errors
///
/// Returns a `config::ConfigError` if a source fails to load.
pub fn build_config() -> Result<Config, config::ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // This file shouldn't be checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(build_config()?.try_deserialize()?)
    }

    /// Channel identifier, required to post
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `BOT_ID` is unset or blank.
    pub fn bot_id(&self) -> Result<&str, ConfigError> {
        non_blank(self.bot_id.as_deref()).ok_or(ConfigError::Missing("BOT_ID"))
    }

    /// Publishing credential, required to upload
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `GM_TOKEN` is unset or blank.
    pub fn access_token(&self) -> Result<&str, ConfigError> {
        non_blank(self.gm_token.as_deref()).ok_or(ConfigError::Missing("GM_TOKEN"))
    }

    /// Returns the set of recognized command tokens
    #[must_use]
    pub fn commands(&self) -> HashSet<String> {
        parse_token_list(&self.commands_str)
    }

    /// Returns the set of tokens that advance the cursor
    #[must_use]
    pub fn next_commands(&self) -> HashSet<String> {
        parse_token_list(&self.next_commands_str)
    }

    /// Timeout applied to each collaborator call
    #[must_use]
    pub const fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    /// Directory downloads are written to before upload
    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a comma, semicolon or whitespace separated list into tokens
#[must_use]
pub fn parse_token_list(raw: &str) -> HashSet<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}
