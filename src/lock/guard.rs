use std::sync::Arc;

use tracing::warn;

use super::{DistributedLock, LockError, LockHandle};

/// Held lock that is released on every exit path.
///
/// Call [`LockGuard::release`] to release explicitly. If the guard is dropped
/// instead (for example because the future owning it was dropped), the
/// release runs on a spawned task.
pub struct LockGuard {
    lock: Arc<dyn DistributedLock>,
    handle: Option<LockHandle>,
}

impl LockGuard {
    pub fn new(lock: Arc<dyn DistributedLock>, handle: LockHandle) -> Self {
        LockGuard {
            lock,
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> Option<&LockHandle> {
        self.handle.as_ref()
    }

    pub async fn release(mut self) -> Result<(), LockError> {
        match self.handle.take() {
            Some(handle) => self.lock.release(handle).await,
            None => Ok(()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(lock_id = handle.lock_id(), "lock guard dropped outside a runtime, lease left to expire");
            return;
        };

        let lock = Arc::clone(&self.lock);
        runtime.spawn(async move {
            let lock_id = handle.lock_id().to_string();
            if let Err(error) = lock.release(handle).await {
                warn!(lock_id, error = %error, "failed to release abandoned lock");
            }
        });
    }
}
