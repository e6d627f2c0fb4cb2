//! WebSocket upgrade handler and per-connection read loop.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::auth::middleware::bearer_token;
use crate::auth::tokens;
use crate::error::ApiError;
use crate::AppState;

use super::connection::WsConnection;
use super::session::ChatSession;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Browsers can't set headers on a WebSocket handshake, so the token may
/// also come in the query string.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Response {
    let token = params.token.as_deref().or_else(|| bearer_token(&headers));
    let username = tokens::identify(state.kv.as_ref(), token).await;
    if username.is_empty() {
        return ApiError::unauthorized("Unauthorized").into_response();
    }

    ws.on_upgrade(move |socket| handle_connection(socket, state, username))
}

async fn handle_connection(socket: WebSocket, state: AppState, username: String) {
    let (ws_tx, mut ws_rx) = socket.split();

    let session =
        match ChatSession::join(&state, username, Box::new(WsConnection::new(ws_tx))).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "could not register chat session");
                return;
            }
        };

    tracing::info!(
        participant_id = %session.participant_id,
        username = %session.username,
        "chat session established"
    );

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(?e, participant_id = %session.participant_id, "ws read error");
                break;
            }
        }
    }

    tracing::info!(
        participant_id = %session.participant_id,
        username = %session.username,
        "chat session ended"
    );
    // Dropping the session submits the leave intent.
}
