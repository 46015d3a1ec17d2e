use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::{Acquire, LeaseStore, LockError, LockHandle, LockLease};
use crate::clock::{Clock, SystemClock};

/// Default upper bound between acquire retries while contending.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Lease-based mutual exclusion across processes.
///
/// This is not a consensus protocol. A crashed holder is recovered by lease
/// expiry, leaving a bounded window with no holder, and badly skewed clocks
/// can briefly let two holders overlap. Callers must tolerate both; the relay
/// does, because delivery is at-least-once and consumers are idempotent.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to take `lock_id` for `lifetime`, waiting up to `timeout` while
    /// another holder has it.
    async fn acquire(
        &self,
        lock_id: &str,
        lifetime: Duration,
        timeout: Duration,
    ) -> Result<Acquire, LockError>;

    /// Give the lock up and wake waiters. Releasing a handle whose lease has
    /// already expired (or been taken over) is a no-op.
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}

/// [`DistributedLock`] built on a conditional write into a [`LeaseStore`]
/// plus its release signal.
///
/// ## Example
///
/// ```ignore
/// let store = InMemoryLeaseStore::new();
/// let lock = LeaseLock::new(store.clone()).with_owner("relay-pod-1");
///
/// if let Acquire::Acquired(handle) = lock
///     .acquire("outbox-relay", Duration::from_secs(30), Duration::from_secs(5))
///     .await?
/// {
///     // ... exclusive work ...
///     lock.release(handle).await?;
/// }
/// ```
pub struct LeaseLock<S> {
    store: S,
    owner: String,
    clock: Arc<dyn Clock>,
    retry_interval: Duration,
}

impl<S: LeaseStore> LeaseLock<S> {
    /// Create a lock with a fresh random owner identity.
    pub fn new(store: S) -> Self {
        LeaseLock {
            store,
            owner: Uuid::new_v4().to_string(),
            clock: Arc::new(SystemClock),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Set the owner identity recorded in leases (e.g. a host or pod name).
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the longest wait between retries while the lock is held elsewhere.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// How long to sleep before the next conditional write: until the release
    /// signal fires, the current lease expires, the retry interval elapses or
    /// the deadline is reached, whichever comes first.
    async fn contention_wait(&self, lock_id: &str, remaining: Duration) -> Result<Duration, LockError> {
        let now = self.clock.now();
        let until_expiry = match self.store.current(lock_id).await? {
            Some(lease) => lease.expires_at.duration_since(now).unwrap_or_default(),
            None => Duration::ZERO,
        };
        Ok(remaining
            .min(self.retry_interval)
            .min(until_expiry.max(Duration::from_millis(1))))
    }
}

#[async_trait]
impl<S: LeaseStore> DistributedLock for LeaseLock<S> {
    async fn acquire(
        &self,
        lock_id: &str,
        lifetime: Duration,
        timeout: Duration,
    ) -> Result<Acquire, LockError> {
        let deadline = Instant::now() + timeout;

        loop {
            let seen = self.store.signal_version(lock_id).await?;
            let now = self.clock.now();
            let lease = LockLease::new(lock_id, self.owner.as_str(), now + lifetime);

            if self.store.try_insert(&lease, now).await? {
                debug!(lock_id, owner = %self.owner, "lock acquired");
                return Ok(Acquire::Acquired(LockHandle::new(lease)));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(lock_id, owner = %self.owner, "lock acquire timed out");
                return Ok(Acquire::TimedOut);
            }

            let wait = self.contention_wait(lock_id, remaining).await?;
            self.store.wait_for_release(lock_id, seen, wait).await?;
        }
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        if handle.is_expired(self.clock.now()) {
            debug!(lock_id = handle.lock_id(), "releasing expired lease, nothing to do");
            return Ok(());
        }
        let removed = self.store.remove(handle.lock_id(), handle.lease_id()).await?;
        debug!(lock_id = handle.lock_id(), removed, "lock released");
        Ok(())
    }
}
