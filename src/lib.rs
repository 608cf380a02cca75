//! Webhook-driven comic bot.
//!
//! Chat messages arrive on an HTTP callback, are classified against the
//! configured command tokens, and recognized requests are answered with an
//! image picked from an ordered catalog (or a random source), re-hosted on
//! the image service and posted back to the channel with a caption.
#![deny(missing_docs)]

/// Command routing, navigation, delivery pipeline and webhook
pub mod bot;
/// External collaborators and their default HTTP/file implementations
pub mod collab;
/// Configuration and settings management
pub mod config;
/// Logging setup with credential redaction
pub mod logging;
/// Process wiring and server lifecycle
pub mod runner;

/// Mock helpers for unit tests
#[cfg(test)]
pub mod testing;
