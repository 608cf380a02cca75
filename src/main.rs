use calvin_bot::config::Settings;
use calvin_bot::logging::{init_logging, RedactionPatterns};
use calvin_bot::runner;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();

    let patterns = match RedactionPatterns::new() {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Failed to initialize redaction patterns: {e}");
            std::process::exit(1);
        }
    };
    init_logging(patterns);

    let settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    info!("Starting bot on port {}", settings.port);
    if let Err(e) = runner::run_bot(settings).await {
        error!("Bot stopped with error: {e:#}");
        std::process::exit(1);
    }
}
