//! Wire payloads exchanged between the chat server and the stock bot.
//!
//! Commands and replies travel on two independent queues. Nothing ties a
//! reply to the command that caused it.

use serde::{Deserialize, Serialize};

/// Default queue carrying [`StockCommand`]s from the chat server to the bot.
pub const STOCK_COMMAND_QUEUE: &str = "stockRequests";

/// Default queue carrying [`BotReply`]s from the bot back to the chat server.
pub const BOT_REPLY_QUEUE: &str = "botResponses";

/// A request to look up a quote for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCommand {
    pub stock_code: String,
}

impl StockCommand {
    pub fn new(stock_code: impl Into<String>) -> Self {
        Self {
            stock_code: stock_code.into(),
        }
    }
}

/// A human-readable result produced by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotReply {
    pub message: String,
}

impl BotReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_command_uses_snake_case_field() {
        let json = serde_json::to_value(StockCommand::new("AAPL")).unwrap();
        assert_eq!(json, serde_json::json!({ "stock_code": "AAPL" }));
    }

    #[test]
    fn bot_reply_decodes_message_field() {
        let reply: BotReply =
            serde_json::from_str(r#"{"message":"AAPL quote is $151.25 per share"}"#).unwrap();
        assert_eq!(reply.message, "AAPL quote is $151.25 per share");
    }

    #[test]
    fn bot_reply_without_message_is_rejected() {
        assert!(serde_json::from_str::<BotReply>(r#"{"msg":"x"}"#).is_err());
    }
}
