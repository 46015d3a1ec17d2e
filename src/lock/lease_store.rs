use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use uuid::Uuid;

use super::{LockError, LockLease};

/// Shared storage for lock leases and release signals.
///
/// This is the cross-replica half of the lock: every relay instance points
/// at the same store. The in-memory store is the default; distributed
/// implementations might use a MongoDB collection with a unique index, a
/// Postgres row with a conditional update, Redis `SET NX PX`, etc.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Conditional write: store `lease` only if no lease for the same lock
    /// exists, or the existing one is expired at `now`.
    /// Returns `Ok(true)` if the lease was written.
    async fn try_insert(&self, lease: &LockLease, now: SystemTime) -> Result<bool, LockError>;

    /// Remove the lease identified by `lease_id` and bump the release signal.
    /// Returns `Ok(false)` when that lease is no longer the stored one.
    async fn remove(&self, lock_id: &str, lease_id: Uuid) -> Result<bool, LockError>;

    /// The stored lease for `lock_id`, expired or not.
    async fn current(&self, lock_id: &str) -> Result<Option<LockLease>, LockError>;

    /// Current version of the release signal for `lock_id`.
    async fn signal_version(&self, lock_id: &str) -> Result<u64, LockError>;

    /// Wait until the release signal moves past `seen` or `max_wait` elapses,
    /// returning the version observed last.
    async fn wait_for_release(
        &self,
        lock_id: &str,
        seen: u64,
        max_wait: Duration,
    ) -> Result<u64, LockError>;
}
