pub mod message;

pub use message::{ChatMessage, BOT_AUTHOR};
