//! Image selection and the shared navigation cursor.
//!
//! [`select_image`] is the selection policy as a plain function of the
//! catalog, the current cursor and the classification. [`Navigator`] owns the
//! cursor and the RNG behind one lock so that selecting and advancing happen
//! as a single step for concurrent requests.

use super::catalog::ImageCatalog;
use super::router::Classification;
use crate::config::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What happens when "next" runs past the last image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationPolicy {
    /// Report the end of the catalog
    #[default]
    Strict,
    /// Continue from the first image
    Wrap,
}

impl NavigationPolicy {
    /// Policy for the `WRAP_NAVIGATION` flag
    #[must_use]
    pub const fn from_wrap(wrap: bool) -> Self {
        if wrap {
            Self::Wrap
        } else {
            Self::Strict
        }
    }
}

/// Reasons an image cannot be selected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// "next" was requested but no catalog is loaded
    #[error("no catalog to navigate")]
    NoCatalog,
    /// "next" ran past the last image
    #[error("end of catalog: position {position} is past the last of {len} images")]
    EndOfCatalog {
        /// Position that was requested
        position: usize,
        /// Catalog size
        len: usize,
    },
    /// Selection was attempted for a message that is not a command
    #[error("unrecognized command has no image")]
    Unrecognized,
}

/// Where the image for a request comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A catalog entry; `position` is the new cursor value
    Catalog {
        /// Image locator
        locator: String,
        /// Catalog position of the locator
        position: usize,
    },
    /// No catalog: ask the random locator source
    RandomSource,
}

/// Select an image for `classification` given the current `cursor`.
///
/// # Errors
///
/// Returns `SelectionError::NoCatalog` for "next" without a catalog,
/// `SelectionError::EndOfCatalog` when "next" passes the end under the strict
/// policy and `SelectionError::Unrecognized` for non-commands.
pub fn select_image<R: Rng>(
    catalog: &ImageCatalog,
    cursor: usize,
    classification: Classification,
    policy: NavigationPolicy,
    rng: &mut R,
) -> Result<Selection, SelectionError> {
    match classification {
        Classification::Unrecognized => Err(SelectionError::Unrecognized),
        Classification::DefaultRequest if catalog.is_empty() => Ok(Selection::RandomSource),
        Classification::DefaultRequest => {
            let position = rng.gen_range(0..catalog.len());
            Ok(at(catalog, position))
        }
        Classification::CycleForward if catalog.is_empty() => Err(SelectionError::NoCatalog),
        Classification::CycleForward => {
            let position = cursor.saturating_add(1);
            if position < catalog.len() {
                Ok(at(catalog, position))
            } else if policy == NavigationPolicy::Wrap {
                Ok(at(catalog, 0))
            } else {
                Err(SelectionError::EndOfCatalog {
                    position,
                    len: catalog.len(),
                })
            }
        }
    }
}

fn at(catalog: &ImageCatalog, position: usize) -> Selection {
    Selection::Catalog {
        locator: catalog.get(position).unwrap_or_default().to_string(),
        position,
    }
}

#[derive(Serialize, Deserialize)]
struct CursorState {
    cursor: usize,
}

struct NavigationState {
    cursor: usize,
    rng: StdRng,
}

/// Owner of the catalog and the cursor shared by all requests
pub struct Navigator {
    catalog: ImageCatalog,
    policy: NavigationPolicy,
    state_path: Option<PathBuf>,
    state: Mutex<NavigationState>,
}

impl Navigator {
    /// Create a navigator starting at position 0 with an entropy-seeded RNG
    #[must_use]
    pub fn new(catalog: ImageCatalog, policy: NavigationPolicy) -> Self {
        Self::with_rng(catalog, policy, StdRng::from_entropy())
    }

    /// Create a navigator with a caller-provided RNG
    #[must_use]
    pub fn with_rng(catalog: ImageCatalog, policy: NavigationPolicy, rng: StdRng) -> Self {
        Self {
            catalog,
            policy,
            state_path: None,
            state: Mutex::new(NavigationState { cursor: 0, rng }),
        }
    }

    /// Start from `cursor` instead of 0
    #[must_use]
    pub fn starting_at(mut self, cursor: usize) -> Self {
        self.state.get_mut().cursor = cursor;
        self
    }

    /// Persist the cursor to `path`, restoring it first if the file exists.
    ///
    /// A saved position outside the catalog is discarded.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::CursorState` if the file exists but cannot be
    /// read or parsed.
    pub async fn with_state_file(mut self, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        if let Some(saved) = load_cursor(&path).await? {
            if saved < self.catalog.len() {
                self.state.get_mut().cursor = saved;
                info!(cursor = saved, path = %path.display(), "Restored navigation cursor");
            } else {
                warn!(
                    cursor = saved,
                    catalog_len = self.catalog.len(),
                    "Saved cursor is outside the catalog, starting from 0"
                );
            }
        }

        self.state_path = Some(path);
        Ok(self)
    }

    /// The catalog being navigated
    #[must_use]
    pub const fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    /// Current cursor value
    pub async fn cursor(&self) -> usize {
        self.state.lock().await.cursor
    }

    /// Select an image and move the cursor to it in one step.
    ///
    /// The cursor is left untouched on error and for random-source picks.
    ///
    /// # Errors
    ///
    /// See [`select_image`].
    pub async fn select(&self, classification: Classification) -> Result<Selection, SelectionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let selection = select_image(
            &self.catalog,
            state.cursor,
            classification,
            self.policy,
            &mut state.rng,
        )?;

        if let Selection::Catalog { position, .. } = &selection {
            if state.cursor != *position {
                debug!(from = state.cursor, to = *position, %classification, "Cursor moved");
                state.cursor = *position;
                // Written under the lock so the file never lags a newer value
                self.persist(*position).await;
            }
        }

        Ok(selection)
    }

    async fn persist(&self, cursor: usize) {
        let Some(path) = &self.state_path else {
            return;
        };

        if let Err(e) = save_cursor(path, cursor).await {
            warn!(cursor, path = %path.display(), "Failed to persist cursor: {e}");
        }
    }
}

/// Sibling file the cursor is written to before it replaces `path`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the cursor next to `path` and rename it into place, so a crash
/// mid-write leaves either the old or the new value.
///
/// # Errors
///
/// Returns an I/O error if the staging file cannot be written or renamed.
pub async fn save_cursor(path: &Path, cursor: usize) -> std::io::Result<()> {
    let body = serde_json::to_vec(&CursorState { cursor })?;
    let staging = staging_path(path);
    tokio::fs::write(&staging, body).await?;
    tokio::fs::rename(&staging, path).await
}

/// Read a persisted cursor; a missing or empty file yields `None`
///
/// # Errors
///
/// Returns `ConfigError::CursorState` if the file cannot be read or parsed.
pub async fn load_cursor(path: &Path) -> Result<Option<usize>, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::CursorState(format!(
                "{}: {e}",
                path.display()
            )))
        }
    };

    if content.trim().is_empty() {
        warn!(path = %path.display(), "Cursor state file is empty, starting from 0");
        return Ok(None);
    }

    let state: CursorState = serde_json::from_str(&content)
        .map_err(|e| ConfigError::CursorState(format!("{}: {e}", path.display())))?;
    Ok(Some(state.cursor))
}
