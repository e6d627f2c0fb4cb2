//! Command/response bridge to the out-of-process stock bot.
//!
//! Commands go out on one queue and replies come back on another. Nothing
//! correlates the two: every reply is shown to everyone as a message from
//! `bot`, in the order replies arrive.

use std::sync::Arc;
use std::time::Duration;

use chat_common::broker::{Broker, BrokerError};
use chat_common::queue::{BotReply, StockCommand};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::gateway::events::OutboundEvent;
use crate::gateway::hub::HubHandle;
use crate::history::MessageHistory;
use crate::models::{ChatMessage, BOT_AUTHOR};

/// How long a single consume call waits before looping.
const CONSUME_WAIT: Duration = Duration::from_secs(1);

/// Pause after a failed consume before trying again.
const CONSUME_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Publishes stock commands. Cloneable, lives in AppState.
#[derive(Clone)]
pub struct CommandBridge {
    broker: Arc<dyn Broker>,
    queue: Arc<str>,
}

impl CommandBridge {
    pub fn new(broker: Arc<dyn Broker>, queue: &str) -> Self {
        Self {
            broker,
            queue: Arc::from(queue),
        }
    }

    /// Publish a command for `stock_code`. Fire-and-forget: success only
    /// means the broker accepted it.
    pub async fn publish_command(&self, stock_code: &str) -> Result<(), BrokerError> {
        let payload = serde_json::to_vec(&StockCommand::new(stock_code))?;
        self.broker.publish(&self.queue, &payload).await?;
        tracing::debug!(%stock_code, queue = %self.queue, "stock command published");
        Ok(())
    }
}

/// Turns bot replies into chat messages.
pub struct ReplyListener {
    broker: Arc<dyn Broker>,
    history: Arc<MessageHistory>,
    hub: HubHandle,
    queue: String,
}

/// A running reply listener.
pub struct ReplyListenerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReplyListenerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(?e, "reply listener task failed");
        }
    }
}

impl ReplyListener {
    pub fn new(
        broker: Arc<dyn Broker>,
        history: Arc<MessageHistory>,
        hub: HubHandle,
        queue: &str,
    ) -> Self {
        Self {
            broker,
            history,
            hub,
            queue: queue.to_string(),
        }
    }

    pub fn spawn(self) -> ReplyListenerHandle {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        ReplyListenerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        tracing::info!(queue = %self.queue, "listening for bot replies");
        loop {
            tokio::select! {
                // A reply popped by an in-flight consume is lost here; delivery is at-most-once.
                _ = &mut shutdown => break,
                result = self.broker.consume(&self.queue, CONSUME_WAIT) => match result {
                    Ok(Some(payload)) => {
                        self.handle_reply(&payload).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, queue = %self.queue, "failed to consume bot reply");
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(CONSUME_RETRY_BACKOFF) => {}
                        }
                    }
                },
            }
        }
        tracing::info!(queue = %self.queue, "reply listener stopped");
    }

    /// Decode one reply, store it as a `bot` message and hand it to the hub.
    ///
    /// Malformed payloads are logged and dropped.
    pub async fn handle_reply(&self, payload: &[u8]) -> Option<ChatMessage> {
        let reply: BotReply = match serde_json::from_slice(payload) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "dropping malformed bot reply"
                );
                return None;
            }
        };

        let message = self.history.append(BOT_AUTHOR, &reply.message);
        if let Err(e) = self.hub.deliver(OutboundEvent::Chat(message.clone())).await {
            tracing::warn!(error = %e, message_id = message.id, "bot reply not delivered");
        }
        Some(message)
    }
}
