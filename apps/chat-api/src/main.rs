use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_api::bridge::ReplyListener;
use chat_api::config::Config;
use chat_api::gateway::hub::Hub;
use chat_api::AppState;

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
    let port = config.port;

    // No broker, no service: sessions would accept commands nobody can answer.
    let broker = match chat_common::broker::connect(&config.broker_url).await {
        Ok(broker) => broker,
        Err(e) => {
            tracing::error!(error = %e, broker_url = %config.broker_url, "broker unreachable, refusing to start");
            std::process::exit(1);
        }
    };

    tracing::info!(
        command_queue = %config.command_queue,
        reply_queue = %config.reply_queue,
        "chat-api configured"
    );

    let hub = Hub::spawn(config.send_timeout);
    let reply_queue = config.reply_queue.clone();
    let state = AppState::new(config, broker.clone(), hub.handle());

    let listener = ReplyListener::new(
        broker.clone(),
        state.history.clone(),
        hub.handle(),
        &reply_queue,
    )
    .spawn();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(chat_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "chat-api listening");

    let tcp = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Upgraded WebSocket sessions outlive `serve`. Stop bot replies first,
    // then the hub shutdown closes every remaining session's socket. Session
    // tasks still hold AppState clones, so the broker is released once they
    // finish, not at the drop below.
    listener.shutdown().await;
    hub.shutdown().await;
    drop(broker);
    tracing::info!("chat-api stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
