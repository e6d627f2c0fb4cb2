pub mod auth;
pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod history;
pub mod models;
pub mod routes;

use std::sync::Arc;

use chat_common::broker::Broker;

use bridge::CommandBridge;
use config::Config;
use db::kv::{KeyValueStore, MemoryStore};
use gateway::hub::HubHandle;
use history::MessageHistory;

/// Shared application state available to all route handlers and sessions.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KeyValueStore>,
    pub config: Arc<Config>,
    pub history: Arc<MessageHistory>,
    pub hub: HubHandle,
    pub bridge: CommandBridge,
}

impl AppState {
    /// Wire up state around an already-running hub and a connected broker.
    pub fn new(config: Config, broker: Arc<dyn Broker>, hub: HubHandle) -> Self {
        let history = Arc::new(MessageHistory::new());
        let bridge = CommandBridge::new(broker, &config.command_queue);
        Self {
            kv: Arc::new(MemoryStore::new()),
            config: Arc::new(config),
            history,
            hub,
            bridge,
        }
    }
}

#[cfg(test)]
mod tests {
    use chat_common::broker::MemoryBroker;

    use super::*;
    use crate::gateway::hub::Hub;
    use crate::history::DEFAULT_HISTORY_CAPACITY;

    #[tokio::test]
    async fn history_keeps_fifty_whatever_the_environment_says() {
        std::env::set_var("HISTORY_CAPACITY", "5");
        let config = Config::from_env();
        std::env::remove_var("HISTORY_CAPACITY");

        let runtime = Hub::spawn(config.send_timeout);
        let state = AppState::new(config, Arc::new(MemoryBroker::new()), runtime.handle());
        for i in 0..60 {
            state.history.append("alice", &format!("msg {i}"));
        }

        let snapshot = state.history.snapshot();
        assert_eq!(snapshot.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(snapshot[0].id, 11);

        runtime.shutdown().await;
    }
}
