//! Command classification.
//!
//! Only the first whitespace-separated token of a message matters. It must be
//! one of the recognized commands; advance aliases additionally move through
//! the catalog instead of picking at random.

use crate::config::Settings;
use std::collections::HashSet;
use std::fmt;

/// What an inbound message asks the bot to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not a bot command
    Unrecognized,
    /// Post a random image
    DefaultRequest,
    /// Post the image after the last one served
    CycleForward,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unrecognized => "unrecognized",
            Self::DefaultRequest => "default",
            Self::CycleForward => "cycle_forward",
        };
        f.write_str(name)
    }
}

/// Recognized command tokens and the subset that advances the cursor
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    recognized: HashSet<String>,
    advance: HashSet<String>,
}

impl CommandSet {
    /// Build a command set from token lists
    pub fn new<I, J, S, T>(recognized: I, advance: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            recognized: recognized.into_iter().map(Into::into).collect(),
            advance: advance.into_iter().map(Into::into).collect(),
        }
    }

    /// Command set configured by `BOT_COMMANDS` and `NEXT_COMMANDS`
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            recognized: settings.commands(),
            advance: settings.next_commands(),
        }
    }

    /// Classify a raw message
    #[must_use]
    pub fn classify(&self, raw_message: &str) -> Classification {
        classify(raw_message, &self.recognized, &self.advance)
    }

    /// Recognized command tokens
    #[must_use]
    pub const fn recognized(&self) -> &HashSet<String> {
        &self.recognized
    }
}

/// Classify `raw_message` against the recognized and advance token sets.
///
/// Matching is exact and case-sensitive. An advance alias that is not also
/// recognized stays unrecognized.
#[must_use]
pub fn classify(
    raw_message: &str,
    recognized: &HashSet<String>,
    advance: &HashSet<String>,
) -> Classification {
    let Some(first) = raw_message.split_whitespace().next() else {
        return Classification::Unrecognized;
    };

    if !recognized.contains(first) {
        Classification::Unrecognized
    } else if advance.contains(first) {
        Classification::CycleForward
    } else {
        Classification::DefaultRequest
    }
}
