//! Read-only access to the in-memory chat history.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::middleware::AuthUser;
use crate::error::ApiErrorBody;
use crate::models::ChatMessage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages))
        .route("/messages/search", get(search_messages))
}

// ---------------------------------------------------------------------------
// GET /api/v1/messages
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "Messages",
    responses(
        (status = 200, description = "Retained messages, oldest first", body = Vec<ChatMessage>),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_messages(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<ChatMessage>> {
    Json(state.history.snapshot())
}

// ---------------------------------------------------------------------------
// GET /api/v1/messages/search?q=
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Case-insensitive substring to look for in message bodies.
    #[serde(default)]
    pub q: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/search",
    tag = "Messages",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching messages, oldest first", body = Vec<ChatMessage>),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn search_messages(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<ChatMessage>> {
    let hits = state.history.search(&params.q);
    tracing::debug!(username = %user.username, term = %params.q, hits = hits.len(), "history search");
    Json(hits)
}
