use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stock_bot::config::Config;
use stock_bot::quote::StooqClient;
use stock_bot::worker::Worker;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let broker = match chat_common::broker::connect(&config.broker_url).await {
        Ok(broker) => broker,
        Err(e) => {
            tracing::error!(error = %e, broker_url = %config.broker_url, "broker unreachable");
            std::process::exit(1);
        }
    };

    let quotes = match StooqClient::new(&config.quote_base_url, config.quote_timeout) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "failed to build quote client");
            std::process::exit(1);
        }
    };

    let worker = Worker::new(broker, quotes, &config.command_queue, &config.reply_queue);
    tracing::info!(
        worker_id = %worker.id(),
        command_queue = %config.command_queue,
        reply_queue = %config.reply_queue,
        quote_base_url = %config.quote_base_url,
        "stock-bot configured"
    );
    let handle = worker.spawn();

    shutdown_signal().await;
    handle.shutdown().await;
    tracing::info!("stock-bot stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
