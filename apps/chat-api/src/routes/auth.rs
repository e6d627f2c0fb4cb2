//! Auth routes: username login and logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::auth::tokens;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub ws_url: String,
    pub username: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "username".to_string(),
            message: "Username is required".to_string(),
        }]));
    }

    let token = tokens::generate_session_token();
    let ttl = state.config.session_ttl_secs;
    tokens::store_session(
        state.kv.as_ref(),
        &token,
        &tokens::SessionData {
            username: username.to_string(),
        },
        ttl,
    )
    .await?;

    tracing::info!(%username, "user logged in");

    Ok(Json(LoginResponse {
        ws_url: format!("/ws?token={token}"),
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: ttl,
        username: username.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/logout
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn logout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    tokens::revoke_session(state.kv.as_ref(), &user.token).await?;
    tracing::info!(username = %user.username, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}
