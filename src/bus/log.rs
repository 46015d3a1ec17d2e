use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::{BatchSender, MessageBatch, SendError};

/// A simple sender that writes batches to the log or a buffer.
pub struct LogSender {
    entity_name: String,
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl LogSender {
    pub fn new(entity_name: impl Into<String>) -> Self {
        LogSender {
            entity_name: entity_name.into(),
            buffer: None,
        }
    }

    pub fn with_buffer(mut self, buffer: Arc<Mutex<Vec<String>>>) -> Self {
        self.buffer = Some(buffer);
        self
    }
}

#[async_trait]
impl BatchSender for LogSender {
    async fn send_batch(&self, batch: MessageBatch) -> Result<(), SendError> {
        let Some(buffer) = &self.buffer else {
            for message in batch.messages() {
                info!(
                    entity = %self.entity_name,
                    message_id = %message.message_id,
                    correlation_id = %message.correlation_id,
                    subject = %message.subject,
                    body = %String::from_utf8_lossy(&message.body),
                    "[OUTBOX] relayed message"
                );
            }
            return Ok(());
        };

        let mut buffer = buffer
            .lock()
            .map_err(|_| SendError::ConnectionFailed("log sender buffer poisoned".into()))?;
        for message in batch.messages() {
            buffer.push(format!(
                "[OUTBOX] {} {} {}",
                self.entity_name,
                message.subject,
                String::from_utf8_lossy(&message.body)
            ));
        }
        Ok(())
    }
}
