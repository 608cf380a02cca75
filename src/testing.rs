//! Testing helpers and mock utilities.
//!
//! Provides convenient constructors for mocked collaborators.

use crate::collab::{
    Collaborators, MockImageFetcher, MockImagePublisher, MockMessageSender, MockQuoteSource,
    MockUrlSource,
};
use std::sync::Arc;

/// One mock per collaborator, configured by the test before use
#[derive(Default)]
pub struct TestMocks {
    /// Random locator source
    pub urls: MockUrlSource,
    /// Image downloader
    pub fetcher: MockImageFetcher,
    /// Caption source
    pub quotes: MockQuoteSource,
    /// Image uploader
    pub publisher: MockImagePublisher,
    /// Message sender
    pub sender: MockMessageSender,
}

/// Wrap configured mocks into engine collaborators.
#[must_use]
pub fn collaborators(mocks: TestMocks) -> Collaborators {
    Collaborators {
        urls: Arc::new(mocks.urls),
        fetcher: Arc::new(mocks.fetcher),
        quotes: Arc::new(mocks.quotes),
        publisher: Arc::new(mocks.publisher),
        sender: Arc::new(mocks.sender),
    }
}

/// Collaborators that fail the test if any of them is called.
///
/// # Example
///
/// ```rust,ignore
/// let engine = BotEngine::new(config, navigator, untouched_collaborators());
/// assert_eq!(engine.handle("hello").await?, Outcome::Ignored);
/// ```
#[must_use]
pub fn untouched_collaborators() -> Collaborators {
    let mut mocks = TestMocks::default();
    mocks.urls.expect_random_url().never();
    mocks.fetcher.expect_download().never();
    mocks.quotes.expect_random_quote().never();
    mocks.publisher.expect_upload().never();
    mocks.sender.expect_send().never();
    collaborators(mocks)
}
