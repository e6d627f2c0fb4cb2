pub mod broker;
pub mod id;
pub mod queue;

pub use broker::{Broker, BrokerError, MemoryBroker, RedisBroker};
pub use queue::{BotReply, StockCommand};
