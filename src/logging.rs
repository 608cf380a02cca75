//! Logging setup with credential redaction.
//!
//! Every formatted log line passes through [`RedactionPatterns`] before it
//! reaches stderr, so the publishing credential and bot id never end up in
//! logs even when an error message echoes a request.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    token_header: Regex,
    token_env: Regex,
    token_query: Regex,
    bot_id_json: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_header: Regex::new(r#"(?i)(x-access-token["']?\s*[:=]\s*["']?)[^\s"',}]+"#)?,
            token_env: Regex::new(r"GM_TOKEN=[^\s&]+")?,
            token_query: Regex::new(r"(?i)(access_token=)[^\s&]+")?,
            bot_id_json: Regex::new(r#"("bot_id"\s*:\s*")[^"]*(")"#)?,
        })
    }

    /// Mask every credential found in `input`
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_header
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .token_env
            .replace_all(&output, "GM_TOKEN=[MASKED]")
            .to_string();
        output = self
            .token_query
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .bot_id_json
            .replace_all(&output, "${1}[MASKED]${2}")
            .to_string();
        output
    }
}

/// Writer that redacts everything written through it
pub struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    /// Wrap `inner`
    pub const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length even though the redacted text may differ.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `MakeWriter` producing [`RedactingWriter`]s
pub struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    /// Wrap a writer factory
    pub const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`) and
/// redacted output on stderr.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
