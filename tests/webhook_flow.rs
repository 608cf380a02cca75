use calvin_bot::bot::{
    webhook, BotConfig, BotEngine, CommandSet, ImageCatalog, NavigationPolicy, Navigator,
};
use calvin_bot::collab::{
    CollaboratorError, Collaborators, ImageFetcher, ImagePublisher, MessageSender, QuoteSource,
    UrlSource,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct StubUrls;

#[async_trait::async_trait]
impl UrlSource for StubUrls {
    async fn random_url(&self) -> Result<String, CollaboratorError> {
        Ok("https://img/random.jpg".to_string())
    }
}

#[derive(Default)]
struct RecordingFetcher {
    calls: AtomicUsize,
    delay: Duration,
}

#[async_trait::async_trait]
impl ImageFetcher for RecordingFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        tokio::fs::write(dest, url.as_bytes()).await?;
        Ok(())
    }
}

struct StubQuotes;

#[async_trait::async_trait]
impl QuoteSource for StubQuotes {
    async fn random_quote(&self) -> Result<String, CollaboratorError> {
        Ok("It's a magical world, Hobbes".to_string())
    }
}

/// Publishes by echoing the downloaded content, so the hosted URL names the source
struct EchoPublisher;

#[async_trait::async_trait]
impl ImagePublisher for EchoPublisher {
    async fn upload(
        &self,
        image_path: &Path,
        access_token: &str,
    ) -> Result<String, CollaboratorError> {
        assert_eq!(access_token, "token");
        let source = tokio::fs::read_to_string(image_path).await?;
        Ok(format!("hosted:{source}"))
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSender {
    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().expect("sender lock").clone()
    }
}

#[async_trait::async_trait]
impl MessageSender for RecordingSender {
    async fn send(
        &self,
        image_url: &str,
        text: &str,
        bot_id: &str,
    ) -> Result<(), CollaboratorError> {
        self.sent.lock().expect("sender lock").push((
            image_url.to_string(),
            text.to_string(),
            bot_id.to_string(),
        ));
        Ok(())
    }
}

struct Harness {
    addr: SocketAddr,
    client: reqwest::Client,
    fetcher: Arc<RecordingFetcher>,
    sender: Arc<RecordingSender>,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
    artifacts: tempfile::TempDir,
}

impl Harness {
    async fn start(catalog: ImageCatalog) -> Self {
        Self::start_with_fetch_delay(catalog, Duration::ZERO).await
    }

    async fn start_with_fetch_delay(catalog: ImageCatalog, delay: Duration) -> Self {
        let artifacts = tempfile::tempdir().expect("tempdir");
        let fetcher = Arc::new(RecordingFetcher {
            calls: AtomicUsize::new(0),
            delay,
        });
        let sender = Arc::new(RecordingSender::default());

        let config = BotConfig {
            commands: CommandSet::new(["comic", "!comic", "next", "!next"], ["next", "!next"]),
            bot_id: "bot-1".to_string(),
            access_token: "token".to_string(),
            artifact_dir: artifacts.path().to_path_buf(),
            timeout: Duration::from_secs(5),
        };
        let navigator =
            Navigator::with_rng(catalog, NavigationPolicy::Strict, StdRng::seed_from_u64(7));
        let collaborators = Collaborators {
            urls: Arc::new(StubUrls),
            fetcher: fetcher.clone(),
            quotes: Arc::new(StubQuotes),
            publisher: Arc::new(EchoPublisher),
            sender: sender.clone(),
        };
        let engine = Arc::new(BotEngine::new(config, navigator, collaborators));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(webhook::serve(listener, engine, async {
            rx.await.ok();
        }));

        Self {
            addr,
            client: reqwest::Client::new(),
            fetcher,
            sender,
            shutdown: Some(tx),
            server: Some(server),
            artifacts,
        }
    }

    /// Trigger graceful shutdown and wait for the server to return
    async fn stop(&mut self) -> std::io::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let server = self.server.take().expect("server running");
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops within 5s")
            .expect("server task panicked")
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post_raw(&self, body: &str) -> reqwest::StatusCode {
        self.client
            .post(self.url(webhook::CALLBACK_PATH))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("callback request")
            .status()
    }

    async fn post_text(&self, text: &str) -> reqwest::StatusCode {
        let body = serde_json::json!({ "text": text, "name": "Calvin", "sender_type": "user" });
        self.post_raw(&body.to_string()).await
    }

    /// Wait until `count` messages were sent, or give up after two seconds
    async fn wait_for_sent(&self, count: usize) -> Vec<(String, String, String)> {
        for _ in 0..200 {
            let sent = self.sender.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sender.sent()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn abc_catalog() -> ImageCatalog {
    ImageCatalog::new(["https://img/a.jpg", "https://img/b.jpg", "https://img/c.jpg"])
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::start(abc_catalog()).await;
    let response = harness
        .client
        .get(harness.url(webhook::HEALTH_PATH))
        .send()
        .await
        .expect("health request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "ok");
}

#[tokio::test]
async fn test_callback_rejects_get() {
    let harness = Harness::start(abc_catalog()).await;
    let response = harness
        .client
        .get(harness.url(webhook::CALLBACK_PATH))
        .send()
        .await
        .expect("callback request");
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_ignored_and_malformed_messages_are_acknowledged() {
    let harness = Harness::start(abc_catalog()).await;

    assert_eq!(harness.post_raw("{not json").await, reqwest::StatusCode::OK);
    assert_eq!(harness.post_raw(r#"{"name":"Susie"}"#).await, reqwest::StatusCode::OK);
    assert_eq!(harness.post_text("hello world").await, reqwest::StatusCode::OK);
    assert_eq!(harness.post_text("the next comic").await, reqwest::StatusCode::OK);

    // A real command afterwards proves the server is still healthy and that
    // nothing above reached the collaborators.
    assert_eq!(harness.post_text("!comic").await, reqwest::StatusCode::OK);
    let sent = harness.wait_for_sent(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sent.len(), 1);
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_next_walks_catalog_until_the_end() {
    let harness = Harness::start(abc_catalog()).await;

    assert_eq!(harness.post_text("next please").await, reqwest::StatusCode::OK);
    let sent = harness.wait_for_sent(1).await;
    assert_eq!(
        sent[0],
        (
            "hosted:https://img/b.jpg".to_string(),
            "It's a magical world, Hobbes".to_string(),
            "bot-1".to_string()
        )
    );

    harness.post_text("!next").await;
    let sent = harness.wait_for_sent(2).await;
    assert_eq!(sent[1].0, "hosted:https://img/c.jpg");

    // Past the last image nothing is delivered but the callback still succeeds
    assert_eq!(harness.post_text("next").await, reqwest::StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.sender.sent().len(), 2);
    assert_eq!(harness.fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_default_request_stays_in_catalog() {
    let harness = Harness::start(abc_catalog()).await;

    harness.post_text("comic").await;
    let sent = harness.wait_for_sent(1).await;

    assert_eq!(sent.len(), 1);
    let hosted = sent[0].0.as_str();
    assert!(
        ["a", "b", "c"]
            .iter()
            .any(|name| hosted == format!("hosted:https://img/{name}.jpg")),
        "unexpected locator {hosted}"
    );
}

#[tokio::test]
async fn test_empty_catalog_uses_random_source() {
    let harness = Harness::start(ImageCatalog::default()).await;

    harness.post_text("comic").await;
    let sent = harness.wait_for_sent(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "hosted:https://img/random.jpg");

    // Cycling forward needs a catalog
    harness.post_text("next").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.sender.sent().len(), 1);
}

#[tokio::test]
async fn test_shutdown_finishes_in_flight_delivery() -> std::io::Result<()> {
    let mut harness =
        Harness::start_with_fetch_delay(abc_catalog(), Duration::from_millis(300)).await;

    assert_eq!(harness.post_text("next").await, reqwest::StatusCode::OK);
    // Let the pipeline reach the slow download before shutting down
    while harness.fetcher.calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    harness.stop().await?;

    let sent = harness.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "hosted:https://img/b.jpg");
    assert_eq!(std::fs::read_dir(harness.artifacts.path())?.count(), 0);
    Ok(())
}
