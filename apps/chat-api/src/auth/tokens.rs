//! Login tokens and identity resolution.
//!
//! This is the identity collaborator the gateway consults: a token maps to a
//! display name, nothing more.

use serde::{Deserialize, Serialize};

use crate::db::kv::KeyValueStore;
use crate::error::ApiError;

/// Generate an opaque random token with the given prefix.
pub fn generate_opaque_token(prefix: &str, bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(&buf))
}

/// Data stored alongside a chat session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
}

pub fn generate_session_token() -> String {
    generate_opaque_token("cst", 32)
}

fn session_key(token: &str) -> String {
    format!("chat:session:{}", token)
}

pub async fn store_session(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &SessionData,
    ttl_secs: u64,
) -> Result<(), ApiError> {
    let value = serde_json::to_string(data)?;
    kv.set_ex(&session_key(token), &value, ttl_secs).await
}

pub async fn lookup_session(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<SessionData>, ApiError> {
    match kv.get(&session_key(token)).await? {
        Some(v) => {
            let data: SessionData =
                serde_json::from_str(&v).map_err(|_| ApiError::internal("corrupt token data"))?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

pub async fn revoke_session(kv: &dyn KeyValueStore, token: &str) -> Result<(), ApiError> {
    kv.del(&session_key(token)).await
}

/// Resolve the display name behind `token`.
///
/// Returns an empty string for a missing, unknown or expired token; callers
/// treat that as unauthenticated.
pub async fn identify(kv: &dyn KeyValueStore, token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return String::new();
    };
    match lookup_session(kv, token).await {
        Ok(Some(data)) => data.username,
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!(error = %e.message, "session lookup failed");
            String::new()
        }
    }
}
