//! Bot core: command routing, image navigation and the delivery pipeline.

/// Ordered image catalog
pub mod catalog;
/// Selection policy and shared cursor
pub mod cursor;
/// Delivery pipeline
pub mod engine;
/// Command classification
pub mod router;
/// Inbound webhook
pub mod webhook;

pub use catalog::ImageCatalog;
pub use cursor::{NavigationPolicy, Navigator, Selection, SelectionError};
pub use engine::{BotConfig, BotEngine, Delivery, Outcome, PipelineError, Stage};
pub use router::{Classification, CommandSet};
