use thiserror::Error;

use crate::bus::SendError;
use crate::config::ConfigError;
use crate::lock::LockError;
use crate::outbox::StoreError;

/// How the relay loop treats an error that ended a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store or lock infrastructure failed; the next tick retries.
    Transient,
    /// A batch could not be delivered; the cycle was aborted as a whole.
    Dispatch,
    /// Orchestration bug; retrying will not help.
    Invariant,
    /// Cancellation was requested.
    Cancelled,
}

/// Error that ends a relay cycle.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("outbox store error: {0}")]
    Store(#[from] StoreError),

    #[error("distributed lock error: {0}")]
    Lock(#[from] LockError),

    #[error("batch dispatch failed: {0}")]
    Dispatch(#[from] SendError),

    #[error("message {message_id} is {size} bytes, larger than the {budget} byte batch budget")]
    MessageTooLarge {
        message_id: String,
        size: usize,
        budget: usize,
    },

    #[error("failed to serialize outbox payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("dispatch task failed: {0}")]
    TaskFailed(String),

    #[error("invalid relay options: {0}")]
    Config(#[from] ConfigError),

    #[error("relay cycle cancelled")]
    Cancelled,
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Store(error) if error.is_invariant_violation() => ErrorKind::Invariant,
            RelayError::Store(_) | RelayError::Lock(_) => ErrorKind::Transient,
            RelayError::Dispatch(_)
            | RelayError::MessageTooLarge { .. }
            | RelayError::Serialization(_)
            | RelayError::TaskFailed(_) => ErrorKind::Dispatch,
            RelayError::Config(_) => ErrorKind::Invariant,
            RelayError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_invariant(&self) -> bool {
        self.kind() == ErrorKind::Invariant
    }
}
