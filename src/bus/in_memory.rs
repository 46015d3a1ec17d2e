//! In-memory broker for testing and single-process scenarios.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::{BatchSender, MessageBatch, SendError, TransportMessage};

/// In-memory broker entity that records every batch it receives.
///
/// Features:
/// - Thread-safe (can be shared across tasks via `Clone`)
/// - Batches are stored in an append-only log in arrival order
///
/// ## Example
///
/// ```ignore
/// let broker = InMemoryBroker::new("orders-topic");
/// let pool = SenderPool::replicate(Arc::new(broker.clone()), 4);
///
/// // ... run a relay cycle with `pool` ...
///
/// assert_eq!(broker.message_count(), 15);
/// ```
#[derive(Clone)]
pub struct InMemoryBroker {
    entity_name: String,
    log: Arc<RwLock<Vec<MessageBatch>>>,
}

impl InMemoryBroker {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Get all batches received so far.
    pub fn batches(&self) -> Vec<MessageBatch> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Message count of each received batch, in arrival order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(MessageBatch::len)
            .collect()
    }

    /// All received messages, batch by batch.
    pub fn messages(&self) -> Vec<TransportMessage> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flat_map(|batch| batch.messages().iter().cloned())
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(MessageBatch::len)
            .sum()
    }

    /// Find all messages with the given subject.
    pub fn find_by_subject(&self, subject: &str) -> Vec<TransportMessage> {
        self.messages()
            .into_iter()
            .filter(|message| message.subject == subject)
            .collect()
    }
}

#[async_trait]
impl BatchSender for InMemoryBroker {
    async fn send_batch(&self, batch: MessageBatch) -> Result<(), SendError> {
        let mut log = self
            .log
            .write()
            .map_err(|_| SendError::ConnectionFailed("in-memory broker log poisoned".into()))?;
        log.push(batch);
        Ok(())
    }
}
