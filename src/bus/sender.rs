//! Broker sender traits and the round-robin sender pool.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::MessageBatch;

/// Error type for batch send operations.
#[derive(Debug, Error)]
pub enum SendError {
    /// Connection to the broker failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The broker rejected the batch
    #[error("batch rejected: {0}")]
    Rejected(String),
    /// Timeout waiting for acknowledgment
    #[error("send timeout")]
    Timeout,
    /// Other error
    #[error("send error: {0}")]
    Other(#[source] Box<dyn Error + Send + Sync>),
}

/// Sends sealed batches to a broker entity (queue or topic).
///
/// Implementations might include:
/// - `InMemoryBroker` - For testing and single-process scenarios
/// - `LogSender` - Writes batches to the log
/// - Azure Service Bus, Kafka, NATS or RabbitMQ producers
#[async_trait]
pub trait BatchSender: Send + Sync {
    /// Send every message in the batch as one broker operation.
    async fn send_batch(&self, batch: MessageBatch) -> Result<(), SendError>;
}

/// Fixed set of senders handed out round-robin.
///
/// Several senders (connections or channels) spread broker I/O so a single
/// sender does not cap throughput. The cursor is atomic because slices
/// dispatch concurrently.
pub struct SenderPool {
    senders: Vec<Arc<dyn BatchSender>>,
    cursor: AtomicUsize,
}

impl SenderPool {
    /// Build a pool; returns `None` when `senders` is empty.
    pub fn new(senders: Vec<Arc<dyn BatchSender>>) -> Option<Self> {
        if senders.is_empty() {
            return None;
        }
        Some(SenderPool {
            senders,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Pool of `count` handles to one shared sender (at least one).
    pub fn replicate(sender: Arc<dyn BatchSender>, count: usize) -> Self {
        SenderPool {
            senders: vec![sender; count.max(1)],
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next sender in round-robin order.
    pub fn next(&self) -> Arc<dyn BatchSender> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        Arc::clone(&self.senders[index])
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
