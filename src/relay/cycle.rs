use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, StreamExt, TryStreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{slicer, BatchBuilder, NoopMetrics, RelayMetrics, SliceReport};
use crate::bus::SenderPool;
use crate::config::{ConfigError, RelayOptions};
use crate::error::{ErrorKind, RelayError};
use crate::lock::{Acquire, DistributedLock, LockGuard};
use crate::outbox::{OutboxSession, OutboxStore, RETIRE_CHUNK_SIZE};

/// Totals of a committed cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub messages: usize,
    pub batches: usize,
    pub retired: u64,
}

/// How a single tick ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another replica held the lock for the whole acquire timeout.
    LockTimedOut,
    /// The snapshot was delivered, retired and committed.
    Relayed(CycleReport),
    /// Cancellation was requested; the transaction was aborted.
    Cancelled,
}

/// One relay replica: the lock-guarded read, dispatch, retire loop.
///
/// ```ignore
/// let cycle = RelayCycle::new(options, store, lock, senders)?
///     .with_metrics(stats.clone());
/// let token = CancellationToken::new();
/// tokio::spawn({
///     let token = token.clone();
///     async move { cycle.run(token).await }
/// });
/// // ... on shutdown
/// token.cancel();
/// ```
pub struct RelayCycle {
    options: RelayOptions,
    store: Arc<dyn OutboxStore>,
    lock: Arc<dyn DistributedLock>,
    senders: Arc<SenderPool>,
    metrics: Arc<dyn RelayMetrics>,
}

impl RelayCycle {
    /// Validates `options` before anything runs.
    pub fn new(
        options: RelayOptions,
        store: Arc<dyn OutboxStore>,
        lock: Arc<dyn DistributedLock>,
        senders: SenderPool,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(RelayCycle {
            options,
            store,
            lock,
            senders: Arc::new(senders),
            metrics: Arc::new(NoopMetrics),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    /// Tick until `token` is cancelled.
    ///
    /// Each tick runs [`RelayCycle::run_once`] and then sleeps for whatever is
    /// left of the tick interval. Transient and dispatch failures are logged
    /// and the loop carries on; an invariant violation stops the loop and is
    /// returned.
    pub async fn run(&self, token: CancellationToken) -> Result<(), RelayError> {
        let interval = self.options.tick_interval();
        info!(
            lock_id = %self.options.lock.lock_id,
            entity = %self.options.broker.entity_name,
            tick_interval_ms = self.options.tick_interval_ms,
            read_limit = self.options.store.read_limit,
            max_degree_of_parallelism = self.options.max_degree_of_parallelism,
            senders = self.senders.len(),
            "outbox relay starting"
        );

        let result = loop {
            if token.is_cancelled() {
                break Ok(());
            }

            let started = Instant::now();
            let outcome = self.run_once(&token).await;
            let elapsed = started.elapsed();
            self.metrics.record_processing_time(elapsed);

            match outcome {
                Ok(CycleOutcome::Cancelled) => break Ok(()),
                Ok(_) => {}
                Err(error) if error.is_invariant() => {
                    error!(invariant = true, error = %error, "relay invariant violated, stopping");
                    break Err(error);
                }
                Err(error) => match error.kind() {
                    ErrorKind::Dispatch => {
                        error!(kind = ?ErrorKind::Dispatch, error = %error, "relay cycle aborted")
                    }
                    kind => warn!(kind = ?kind, error = %error, "relay cycle aborted"),
                },
            }

            if let Some(delay) = remaining_delay(interval, elapsed) {
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = token.cancelled() => break Ok(()),
                }
            }
        };

        info!(lock_id = %self.options.lock.lock_id, "outbox relay stopped");
        result
    }

    /// Run a single tick without the trailing delay.
    ///
    /// Whatever happens after the lock is acquired, the open transaction is
    /// committed or aborted and the lock is released before this returns.
    pub async fn run_once(&self, token: &CancellationToken) -> Result<CycleOutcome, RelayError> {
        let span = info_span!(
            "relay_cycle",
            lock_id = %self.options.lock.lock_id,
            entity = %self.options.broker.entity_name
        );
        self.tick(token).instrument(span).await
    }

    async fn tick(&self, token: &CancellationToken) -> Result<CycleOutcome, RelayError> {
        let lock_id = self.options.lock.lock_id.as_str();
        let acquired = tokio::select! {
            () = token.cancelled() => return Ok(CycleOutcome::Cancelled),
            acquired = self.lock.acquire(
                lock_id,
                self.options.lease_lifetime(),
                self.options.acquire_timeout(),
            ) => acquired?,
        };
        let handle = match acquired {
            Acquire::Acquired(handle) => handle,
            Acquire::TimedOut => {
                debug!(lock_id, "relay lock held elsewhere, skipping cycle");
                return Ok(CycleOutcome::LockTimedOut);
            }
        };

        let guard = LockGuard::new(Arc::clone(&self.lock), handle);
        let mut session = OutboxSession::new(Arc::clone(&self.store));

        let processed = self.process(&mut session, token).await;
        let finished = self.finish(&mut session, processed).await;

        if let Err(error) = guard.release().await {
            warn!(lock_id, error = %error, "failed to release relay lock, lease will expire");
        }

        match finished {
            Ok(report) => {
                if report.messages > 0 {
                    info!(
                        messages = report.messages,
                        batches = report.batches,
                        retired = report.retired,
                        "relay cycle committed"
                    );
                }
                Ok(CycleOutcome::Relayed(report))
            }
            Err(RelayError::Cancelled) => {
                info!(lock_id, "relay cycle cancelled, transaction aborted");
                Ok(CycleOutcome::Cancelled)
            }
            Err(error) => Err(error),
        }
    }

    /// Read, dispatch and retire inside the session's transaction. Leaves
    /// the transaction open for [`RelayCycle::finish`].
    async fn process(
        &self,
        session: &mut OutboxSession,
        token: &CancellationToken,
    ) -> Result<CycleReport, RelayError> {
        tokio::select! {
            () = token.cancelled() => return Err(RelayError::Cancelled),
            started = session.start_transaction() => started?,
        }

        let snapshot = tokio::select! {
            () = token.cancelled() => return Err(RelayError::Cancelled),
            found = session.find_messages(
                self.options.store.read_limit,
                self.options.store.page_size,
            ) => found?,
        };
        if snapshot.is_empty() {
            debug!("outbox empty");
            return Ok(CycleReport::default());
        }
        debug!(messages = snapshot.len(), "outbox snapshot read");

        let parallelism = self.options.max_degree_of_parallelism;
        let builder = BatchBuilder::new(
            Arc::clone(&self.senders),
            Arc::clone(&self.metrics),
            self.options.broker.batch_byte_budget,
            self.options.broker.batch_message_count,
        );
        let pending: Vec<_> = slicer::slice(&snapshot, parallelism)
            .into_iter()
            .enumerate()
            .map(|(index, slice)| {
                let span = info_span!("relay_slice", slice = index, messages = slice.len());
                builder.build_and_dispatch(slice, token).instrument(span)
            })
            .collect();
        let reports: Vec<SliceReport> = stream::iter(pending)
            .buffer_unordered(parallelism)
            .try_collect()
            .await?;

        if token.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        let retired = session.retire_chunks(&snapshot, RETIRE_CHUNK_SIZE).await?;

        Ok(CycleReport {
            messages: reports.iter().map(|r| r.messages).sum(),
            batches: reports.iter().map(|r| r.batches).sum(),
            retired,
        })
    }

    /// Commit after a fully successful cycle, abort otherwise.
    async fn finish(
        &self,
        session: &mut OutboxSession,
        processed: Result<CycleReport, RelayError>,
    ) -> Result<CycleReport, RelayError> {
        match processed {
            Ok(report) => {
                session.commit().await?;
                Ok(report)
            }
            Err(error) => {
                if session.is_open() {
                    if let Err(abort_error) = session.abort().await {
                        warn!(error = %abort_error, "failed to abort outbox transaction");
                    }
                }
                Err(error)
            }
        }
    }
}

/// Time left of `interval` after a tick that took `elapsed`, if any.
pub fn remaining_delay(interval: Duration, elapsed: Duration) -> Option<Duration> {
    interval.checked_sub(elapsed).filter(|delay| !delay.is_zero())
}
