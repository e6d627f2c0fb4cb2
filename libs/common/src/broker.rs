//! Queue-style message broker shared by the chat server and the stock bot.
//!
//! Each named queue delivers every payload to exactly one consumer. There is
//! no ordering guarantee between independent queues and no correlation
//! between a payload on one queue and a payload on another.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Notify;
use tokio::time::Instant;

/// URL scheme selecting the in-process broker.
pub const MEMORY_URL: &str = "memory://";

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("broker unavailable")]
    Unavailable,
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Abstraction over the queueing middleware.
///
/// Backed by Redis lists in production and an in-process map in tests.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append a payload to the tail of `queue`.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Pop the next payload from `queue`, waiting at most `wait`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn consume(&self, queue: &str, wait: Duration) -> Result<Option<Vec<u8>>, BrokerError>;

    /// Check that the broker is reachable.
    async fn ping(&self) -> Result<(), BrokerError>;
}

/// Connect to the broker named by `url` and verify it answers.
///
/// `memory://` selects [`MemoryBroker`]; anything else is handed to Redis.
pub async fn connect(url: &str) -> Result<Arc<dyn Broker>, BrokerError> {
    let broker: Arc<dyn Broker> = if url == MEMORY_URL {
        Arc::new(MemoryBroker::new())
    } else {
        Arc::new(RedisBroker::connect(url).await?)
    };
    broker.ping().await?;
    Ok(broker)
}

// ---------------------------------------------------------------------------
// Redis implementation
// ---------------------------------------------------------------------------

/// Redis lists used as work queues: `RPUSH` to publish, `BLPOP` to consume.
pub struct RedisBroker {
    publisher: ConnectionManager,
    // Blocking pops hold the connection, so consumers get their own.
    consumer: ConnectionManager,
}

impl RedisBroker {
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        let consumer = ConnectionManager::new(client).await?;
        tracing::info!("redis broker connected");
        Ok(Self {
            publisher,
            consumer,
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut conn = self.publisher.clone();
        conn.rpush::<_, _, ()>(queue, payload).await.map_err(|e| {
            tracing::error!(?e, %queue, "redis rpush failed");
            BrokerError::from(e)
        })
    }

    async fn consume(&self, queue: &str, wait: Duration) -> Result<Option<Vec<u8>>, BrokerError> {
        let mut conn = self.consumer.clone();
        // BLPOP treats 0 as "block forever"; never ask for that.
        let secs = wait.as_secs_f64().max(0.01);
        let popped: Option<(String, Vec<u8>)> = conn.blpop(queue, secs).await?;
        Ok(popped.map(|(_, payload)| payload))
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let mut conn = self.publisher.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (for local runs / tests)
// ---------------------------------------------------------------------------

pub struct MemoryBroker {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    notify: Notify,
    available: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the broker. While unavailable every
    /// operation fails with [`BrokerError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of payloads waiting on `queue`.
    pub fn pending(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, VecDeque::len)
    }

    fn check_available(&self) -> Result<(), BrokerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Unavailable)
        }
    }

    fn pop(&self, queue: &str) -> Option<Vec<u8>> {
        self.queues.lock().get_mut(queue)?.pop_front()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.check_available()?;
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_vec());
        self.notify.notify_waiters();
        Ok(())
    }

    async fn consume(&self, queue: &str, wait: Duration) -> Result<Option<Vec<u8>>, BrokerError> {
        let deadline = Instant::now() + wait;
        loop {
            self.check_available()?;

            // Register interest before checking so a concurrent publish
            // between the check and the wait is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.pop(queue) {
                return Ok(Some(payload));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        self.check_available()
    }
}
