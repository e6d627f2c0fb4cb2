//! Consume stock commands, look up quotes, publish replies.

use std::sync::Arc;
use std::time::Duration;

use chat_common::broker::Broker;
use chat_common::id::{prefix, prefixed_ulid};
use chat_common::queue::{BotReply, StockCommand};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::quote::QuoteSource;

const CONSUME_WAIT: Duration = Duration::from_secs(1);
const CONSUME_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// The reply sent whenever a quote cannot be produced.
pub fn fallback_message(stock_code: &str) -> String {
    format!("Could not fetch stock for {stock_code}")
}

pub struct Worker {
    id: String,
    broker: Arc<dyn Broker>,
    quotes: Arc<dyn QuoteSource>,
    command_queue: String,
    reply_queue: String,
}

/// A running worker.
pub struct WorkerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(?e, "stock worker task failed");
        }
    }
}

impl Worker {
    pub fn new(
        broker: Arc<dyn Broker>,
        quotes: Arc<dyn QuoteSource>,
        command_queue: &str,
        reply_queue: &str,
    ) -> Self {
        Self {
            id: prefixed_ulid(prefix::WORKER),
            broker,
            quotes,
            command_queue: command_queue.to_string(),
            reply_queue: reply_queue.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spawn(self) -> WorkerHandle {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        tracing::info!(worker_id = %self.id, queue = %self.command_queue, "waiting for stock requests");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.broker.consume(&self.command_queue, CONSUME_WAIT) => match result {
                    Ok(Some(payload)) => {
                        self.handle_command(&payload).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(worker_id = %self.id, error = %e, "failed to consume stock command");
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(CONSUME_RETRY_BACKOFF) => {}
                        }
                    }
                },
            }
        }
        tracing::info!(worker_id = %self.id, "stock worker stopped");
    }

    /// Answer one command payload.
    ///
    /// Returns the reply that was produced, or `None` for a payload that is
    /// not a stock command. A failed lookup still yields the fallback reply.
    pub async fn handle_command(&self, payload: &[u8]) -> Option<BotReply> {
        let command: StockCommand = match serde_json::from_slice(payload) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(
                    worker_id = %self.id,
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "dropping malformed stock command"
                );
                return None;
            }
        };

        let request_id = prefixed_ulid(prefix::REQUEST);
        tracing::info!(%request_id, stock_code = %command.stock_code, "stock request received");

        let message = match self.quotes.quote(&command.stock_code).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(%request_id, stock_code = %command.stock_code, error = %e, "quote lookup failed");
                fallback_message(&command.stock_code)
            }
        };
        let reply = BotReply::new(message);

        match serde_json::to_vec(&reply) {
            Ok(body) => {
                if let Err(e) = self.broker.publish(&self.reply_queue, &body).await {
                    tracing::error!(%request_id, error = %e, "failed to publish bot reply");
                } else {
                    tracing::debug!(%request_id, "bot reply published");
                }
            }
            Err(e) => tracing::error!(%request_id, error = %e, "failed to encode bot reply"),
        }

        Some(reply)
    }
}
