//! Per-connection chat session: frame classification and dispatch.

use std::sync::Arc;

use crate::bridge::CommandBridge;
use crate::history::MessageHistory;
use crate::AppState;

use super::connection::Connection;
use super::events::OutboundEvent;
use super::hub::{HubClosed, HubHandle};
use super::registry::ParticipantId;

/// Frames starting with this prefix are stock commands, not chat.
pub const STOCK_COMMAND_PREFIX: &str = "/stock=";

/// What an inbound text frame asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Publish a quote request for the (trimmed) code.
    Command(&'a str),
    /// Store and broadcast as a chat message.
    Chat(&'a str),
    /// A command with nothing after the prefix.
    Ignored,
}

pub fn classify(text: &str) -> Frame<'_> {
    match text.strip_prefix(STOCK_COMMAND_PREFIX) {
        Some(rest) => match rest.trim() {
            "" => Frame::Ignored,
            code => Frame::Command(code),
        },
        None => Frame::Chat(text),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unauthenticated")]
    Unauthorized,
    #[error(transparent)]
    HubClosed(#[from] HubClosed),
}

/// Submits `leave` when dropped, whatever the reason the session ended.
struct LeaveGuard {
    hub: HubHandle,
    id: ParticipantId,
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        self.hub.leave(self.id);
    }
}

/// One registered participant for the lifetime of its connection.
pub struct ChatSession {
    pub participant_id: ParticipantId,
    pub username: String,
    history: Arc<MessageHistory>,
    hub: HubHandle,
    bridge: CommandBridge,
    _leave: LeaveGuard,
}

impl ChatSession {
    /// Register `connection` with the hub under `username`.
    ///
    /// An empty identity is refused before anything is registered.
    pub async fn join(
        state: &AppState,
        username: String,
        connection: Box<dyn Connection>,
    ) -> Result<Self, SessionError> {
        if username.is_empty() {
            return Err(SessionError::Unauthorized);
        }

        let participant_id = state.hub.join(username.clone(), connection).await?;

        Ok(Self {
            participant_id,
            username,
            history: state.history.clone(),
            hub: state.hub.clone(),
            bridge: state.bridge.clone(),
            _leave: LeaveGuard {
                hub: state.hub.clone(),
                id: participant_id,
            },
        })
    }

    /// Handle one inbound text frame. Failures are logged and never end the
    /// session.
    pub async fn handle_text(&self, text: &str) {
        match classify(text) {
            Frame::Command(code) => {
                // No reply will show up; that is the only signal the user gets.
                if let Err(e) = self.bridge.publish_command(code).await {
                    tracing::warn!(
                        participant_id = %self.participant_id,
                        stock_code = %code,
                        error = %e,
                        "failed to publish stock command"
                    );
                }
            }
            Frame::Chat(body) => {
                let message = self.history.append(&self.username, body);
                if let Err(e) = self.hub.deliver(OutboundEvent::Chat(message)).await {
                    tracing::warn!(participant_id = %self.participant_id, error = %e, "chat not delivered");
                }
            }
            Frame::Ignored => {
                tracing::debug!(participant_id = %self.participant_id, "empty stock command dropped");
            }
        }
    }
}
