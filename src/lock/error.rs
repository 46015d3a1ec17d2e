use thiserror::Error;

/// Error type for distributed lock operations.
///
/// Failing to obtain the lock within the wait timeout is not an error; see
/// [`Acquire::TimedOut`](super::Acquire::TimedOut).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// An in-process primitive guarding lock state was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// The shared lock store could not be reached.
    #[error("lock store unavailable: {0}")]
    Unavailable(String),
    /// The lease could not be released.
    #[error("lock release failed: {0}")]
    ReleaseFailed(String),
}
