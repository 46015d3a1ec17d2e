use crate::outbox::OutboxRecord;

/// Content type stamped on every relayed message.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Fixed per-message framing cost counted against the batch byte budget.
pub const MESSAGE_OVERHEAD_BYTES: usize = 64;

/// A message as handed to the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportMessage {
    pub message_id: String,
    pub correlation_id: String,
    pub subject: String,
    pub content_type: String,
    /// Serialized record payload.
    pub body: Vec<u8>,
}

impl TransportMessage {
    /// Map an outbox record onto the broker's message shape.
    pub fn from_record(record: &OutboxRecord) -> Result<Self, serde_json::Error> {
        Ok(TransportMessage {
            message_id: record.id.to_string(),
            correlation_id: record.correlation_id.to_string(),
            subject: record.subject.clone(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            body: serde_json::to_vec(&record.body)?,
        })
    }

    /// Encoded size counted against a batch's byte budget.
    pub fn size_in_bytes(&self) -> usize {
        self.body.len()
            + self.message_id.len()
            + self.correlation_id.len()
            + self.subject.len()
            + self.content_type.len()
            + MESSAGE_OVERHEAD_BYTES
    }

    /// Get the body as a string (if valid UTF-8).
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
