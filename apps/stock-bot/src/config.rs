use std::time::Duration;

use chat_common::queue::{BOT_REPLY_QUEUE, STOCK_COMMAND_QUEUE};

/// Stock bot configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker connection string (`redis://...` or `memory://`).
    pub broker_url: String,
    /// Queue the bot consumes stock commands from.
    pub command_queue: String,
    /// Queue the bot publishes replies to.
    pub reply_queue: String,
    /// Origin of the quote service, without a trailing path.
    pub quote_base_url: String,
    /// Per-request timeout for the quote service.
    pub quote_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            broker_url: required_var("BROKER_URL"),
            command_queue: std::env::var("STOCK_COMMAND_QUEUE")
                .unwrap_or_else(|_| STOCK_COMMAND_QUEUE.to_string()),
            reply_queue: std::env::var("BOT_REPLY_QUEUE")
                .unwrap_or_else(|_| BOT_REPLY_QUEUE.to_string()),
            quote_base_url: std::env::var("QUOTE_BASE_URL")
                .unwrap_or_else(|_| "https://stooq.com".to_string()),
            quote_timeout: Duration::from_secs(
                std::env::var("QUOTE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
