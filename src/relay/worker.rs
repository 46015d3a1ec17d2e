use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::RelayCycle;
use crate::error::RelayError;

/// A background task that runs a [`RelayCycle`] until stopped.
///
/// ## Example
///
/// ```ignore
/// let worker = RelayWorker::spawn(cycle);
///
/// // ... serve traffic ...
///
/// worker.stop().await?;
/// ```
///
/// Dropping the worker cancels it without waiting for the loop to unwind.
pub struct RelayWorker {
    token: CancellationToken,
    handle: Option<JoinHandle<Result<(), RelayError>>>,
}

impl RelayWorker {
    pub fn spawn(cycle: RelayCycle) -> Self {
        Self::spawn_with_token(cycle, CancellationToken::new())
    }

    /// Spawn a worker that also stops when `token` (e.g. the host's shutdown
    /// token) is cancelled.
    pub fn spawn_with_token(cycle: RelayCycle, token: CancellationToken) -> Self {
        let run_token = token.clone();
        let handle = tokio::spawn(async move { cycle.run(run_token).await });
        RelayWorker {
            token,
            handle: Some(handle),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// False once the loop has exited, either stopped or on an invariant
    /// violation.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the loop and wait for the in-flight cycle to unwind.
    pub async fn stop(mut self) -> Result<(), RelayError> {
        self.token.cancel();
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| RelayError::TaskFailed(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for RelayWorker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
