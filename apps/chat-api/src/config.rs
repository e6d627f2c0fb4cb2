use std::str::FromStr;
use std::time::Duration;

use chat_common::queue::{BOT_REPLY_QUEUE, STOCK_COMMAND_QUEUE};

use crate::gateway::hub::DEFAULT_SEND_TIMEOUT;

/// Chat API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Broker connection string (`redis://...`, or `memory://` for in-process).
    pub broker_url: String,
    /// Queue stock commands are published to.
    pub command_queue: String,
    /// Queue bot replies are consumed from.
    pub reply_queue: String,
    /// Per-recipient deadline for a single hub send.
    pub send_timeout: Duration,
    /// Lifetime of a login token.
    pub session_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4002,
            broker_url: "redis://localhost:6379/0".to_string(),
            command_queue: STOCK_COMMAND_QUEUE.to_string(),
            reply_queue: BOT_REPLY_QUEUE.to_string(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            session_ttl_secs: 24 * 3600,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parsed_var("PORT").unwrap_or(defaults.port),
            broker_url: std::env::var("BROKER_URL").unwrap_or(defaults.broker_url),
            command_queue: std::env::var("STOCK_COMMAND_QUEUE").unwrap_or(defaults.command_queue),
            reply_queue: std::env::var("BOT_REPLY_QUEUE").unwrap_or(defaults.reply_queue),
            send_timeout: parsed_var("HUB_SEND_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.send_timeout),
            session_ttl_secs: parsed_var("SESSION_TTL_SECS").unwrap_or(defaults.session_ttl_secs),
        }
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
