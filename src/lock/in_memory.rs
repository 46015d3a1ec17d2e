use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::{LeaseStore, LockError, LockLease, ReleaseSignal};

/// In-memory lease store backed by a `Mutex<HashMap<..>>` of leases and one
/// `watch` channel per lock acting as its release signal.
///
/// Cloning creates another handle to the same store, so several
/// [`LeaseLock`](super::LeaseLock)s built on clones contend exactly like
/// replicas sharing a database.
#[derive(Clone, Default)]
pub struct InMemoryLeaseStore {
    leases: Arc<Mutex<HashMap<String, LockLease>>>,
    signals: Arc<Mutex<HashMap<String, watch::Sender<u64>>>>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the release signal for `lock_id`.
    pub fn release_signal(&self, lock_id: &str) -> Result<ReleaseSignal, LockError> {
        let version = *self.signal(lock_id)?.borrow();
        Ok(ReleaseSignal {
            lock_id: lock_id.to_string(),
            version,
        })
    }

    fn signal(&self, lock_id: &str) -> Result<watch::Receiver<u64>, LockError> {
        let mut signals = self
            .signals
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        Ok(signals
            .entry(lock_id.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe())
    }

    fn bump(&self, lock_id: &str) -> Result<(), LockError> {
        let mut signals = self
            .signals
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        signals
            .entry(lock_id.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .send_modify(|version| *version += 1);
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn try_insert(&self, lease: &LockLease, now: SystemTime) -> Result<bool, LockError> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        match leases.get(&lease.lock_id) {
            Some(existing) if !existing.is_expired(now) => Ok(false),
            _ => {
                leases.insert(lease.lock_id.clone(), lease.clone());
                Ok(true)
            }
        }
    }

    async fn remove(&self, lock_id: &str, lease_id: Uuid) -> Result<bool, LockError> {
        let removed = {
            let mut leases = self
                .leases
                .lock()
                .map_err(|e| LockError::Poisoned(e.to_string()))?;
            match leases.get(lock_id) {
                Some(existing) if existing.lease_id == lease_id => {
                    leases.remove(lock_id);
                    true
                }
                _ => false,
            }
        };
        if removed {
            self.bump(lock_id)?;
        }
        Ok(removed)
    }

    async fn current(&self, lock_id: &str) -> Result<Option<LockLease>, LockError> {
        let leases = self
            .leases
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        Ok(leases.get(lock_id).cloned())
    }

    async fn signal_version(&self, lock_id: &str) -> Result<u64, LockError> {
        Ok(*self.signal(lock_id)?.borrow())
    }

    async fn wait_for_release(
        &self,
        lock_id: &str,
        seen: u64,
        max_wait: Duration,
    ) -> Result<u64, LockError> {
        let mut signal = self.signal(lock_id)?;
        let released = tokio::time::timeout(max_wait, signal.wait_for(|version| *version > seen))
            .await
            .ok()
            .and_then(|changed| changed.ok())
            .map(|version| *version);
        // Timed out: report the latest version.
        Ok(released.unwrap_or_else(|| *signal.borrow()))
    }
}
