use thiserror::Error;

/// Error type for outbox store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or the operation failed in transit.
    #[error("outbox store unavailable: {0}")]
    Unavailable(String),
    /// The transaction conflicted with a concurrent writer.
    #[error("outbox transaction conflict: {0}")]
    Conflict(String),
    /// An in-process lock guarding store state was poisoned.
    #[error("outbox store lock poisoned during {0}")]
    Poisoned(&'static str),
    /// Commit, abort, read or retire was requested with no open transaction.
    #[error("no open outbox transaction")]
    NoTransaction,
    /// The transaction handle is not known to the store (already finished).
    #[error("unknown outbox transaction {0}")]
    UnknownTransaction(u64),
}

impl StoreError {
    /// Whether the error reveals a bug in the caller's transaction handling
    /// rather than a condition that a later retry could clear.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            StoreError::NoTransaction | StoreError::UnknownTransaction(_)
        )
    }
}
