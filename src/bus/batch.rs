use super::TransportMessage;

/// Broker batch bounded by a byte budget and a message count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBatch {
    messages: Vec<TransportMessage>,
    size_in_bytes: usize,
    max_bytes: usize,
    max_count: usize,
}

impl MessageBatch {
    pub fn new(max_bytes: usize, max_count: usize) -> Self {
        MessageBatch {
            messages: Vec::new(),
            size_in_bytes: 0,
            max_bytes,
            max_count,
        }
    }

    /// Append `message` if both bounds still hold afterwards; otherwise hand
    /// it back untouched.
    pub fn try_add(&mut self, message: TransportMessage) -> Result<(), TransportMessage> {
        let size = message.size_in_bytes();
        if self.messages.len() >= self.max_count || self.size_in_bytes + size > self.max_bytes {
            return Err(message);
        }
        self.size_in_bytes += size;
        self.messages.push(message);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn messages(&self) -> &[TransportMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<TransportMessage> {
        self.messages
    }
}
