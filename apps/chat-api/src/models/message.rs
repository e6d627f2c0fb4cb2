use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Author identity used for replies coming back from the stock bot.
pub const BOT_AUTHOR: &str = "bot";

/// A chat message retained in the history store and broadcast to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub id: u64,
    pub user: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
