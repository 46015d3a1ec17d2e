use std::sync::Mutex;

use async_trait::async_trait;
use event_emitter_rs::EventEmitter;

use super::{BatchSender, MessageBatch, SendError};

/// A sender that emits relayed messages via an `EventEmitter` for in-process
/// subscribers. Each message body is emitted as a string under its subject.
/// Requires the `emitter` feature to be enabled.
pub struct EmitterSender {
    emitter: Mutex<EventEmitter>,
}

impl EmitterSender {
    pub fn new(emitter: EventEmitter) -> Self {
        EmitterSender {
            emitter: Mutex::new(emitter),
        }
    }
}

#[async_trait]
impl BatchSender for EmitterSender {
    async fn send_batch(&self, batch: MessageBatch) -> Result<(), SendError> {
        let mut emitter = self
            .emitter
            .lock()
            .map_err(|_| SendError::ConnectionFailed("event emitter poisoned".into()))?;
        for message in batch.into_messages() {
            // Listeners run on their own threads; delivery is fire-and-forget.
            let body = String::from_utf8_lossy(&message.body).into_owned();
            emitter.emit(&message.subject, body);
        }
        Ok(())
    }
}
