use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chat_api::auth::tokens;
use chat_api::bridge::{ReplyListener, ReplyListenerHandle};
use chat_api::config::Config;
use chat_api::gateway::hub::{Hub, HubRuntime};
use chat_api::AppState;
use chat_common::broker::MemoryBroker;

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything a test needs to drive the app and play the stock bot.
///
/// Keep it alive for the duration of the test: dropping it stops the hub.
pub struct TestContext {
    pub state: AppState,
    pub broker: Arc<MemoryBroker>,
    pub hub: HubRuntime,
    pub listener: ReplyListenerHandle,
}

impl TestContext {
    pub async fn shutdown(self) {
        self.listener.shutdown().await;
        self.hub.shutdown().await;
    }
}

/// Build a test AppState backed by the in-memory broker and a live hub.
pub fn test_context() -> TestContext {
    let config = Config {
        send_timeout: Duration::from_millis(500),
        ..Config::default()
    };
    let broker = Arc::new(MemoryBroker::new());
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

    TestContext {
        state,
        broker,
        hub,
        listener,
    }
}

/// Build the full application router wired to a fresh test context.
pub fn test_app() -> (Router, TestContext) {
    let ctx = test_context();
    let app = chat_api::routes::router().with_state(ctx.state.clone());
    (app, ctx)
}

/// Start an actual TCP server for WebSocket testing.
pub async fn start_ws_server() -> (SocketAddr, TestContext) {
    let (app, ctx) = test_app();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, ctx)
}

/// Issue a login token directly, skipping the HTTP route.
pub async fn issue_token(state: &AppState, username: &str) -> String {
    let token = tokens::generate_session_token();
    tokens::store_session(
        state.kv.as_ref(),
        &token,
        &tokens::SessionData {
            username: username.to_string(),
        },
        60,
    )
    .await
    .expect("store session");
    token
}

/// Connect to `/ws` as `username`.
pub async fn connect(addr: SocketAddr, state: &AppState, username: &str) -> WsClient {
    let token = issue_token(state, username).await;
    let url = format!("ws://{addr}/ws?token={token}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws
}

/// Read the next JSON event, failing after five seconds.
pub async fn next_event(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for event")
            .expect("stream ended")
            .expect("ws read error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).expect("event json"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Read events until a `user-list` equal to `expected` shows up.
pub async fn wait_for_users(ws: &mut WsClient, expected: &[&str]) {
    loop {
        let event = next_event(ws).await;
        if event["type"] == "user-list" && event["data"] == serde_json::json!(expected) {
            return;
        }
    }
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("send text");
}

/// Assert no text frame arrives within a short window.
pub async fn assert_no_event(ws: &mut WsClient) {
    if let Ok(Some(Ok(Message::Text(text)))) =
        time::timeout(Duration::from_millis(150), ws.next()).await
    {
        panic!("unexpected event: {}", text.as_str());
    }
}
