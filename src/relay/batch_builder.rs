use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use super::RelayMetrics;
use crate::bus::{MessageBatch, SenderPool, TransportMessage};
use crate::error::RelayError;
use crate::outbox::OutboxRecord;

/// What one slice produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SliceReport {
    pub messages: usize,
    pub batches: usize,
}

/// Packs a slice into bounded [`MessageBatch`]es and dispatches each sealed
/// batch through the next sender of the pool.
pub struct BatchBuilder {
    senders: Arc<SenderPool>,
    metrics: Arc<dyn RelayMetrics>,
    max_batch_bytes: usize,
    max_batch_count: usize,
}

impl BatchBuilder {
    pub fn new(
        senders: Arc<SenderPool>,
        metrics: Arc<dyn RelayMetrics>,
        max_batch_bytes: usize,
        max_batch_count: usize,
    ) -> Self {
        BatchBuilder {
            senders,
            metrics,
            max_batch_bytes,
            max_batch_count: max_batch_count.max(1),
        }
    }

    /// Convert `slice` to transport messages in order and dispatch them.
    ///
    /// A batch is sealed as soon as the next message would break its byte
    /// budget or message count, and its send starts immediately while
    /// packing continues. Every send is awaited before returning. The first
    /// failed send aborts the remaining ones and is returned.
    ///
    /// Once `token` is cancelled no further batch is dispatched and the call
    /// returns [`RelayError::Cancelled`].
    pub async fn build_and_dispatch(
        &self,
        slice: &[OutboxRecord],
        token: &CancellationToken,
    ) -> Result<SliceReport, RelayError> {
        let mut dispatches = JoinSet::new();
        let mut report = SliceReport::default();
        let mut batch = self.open_batch();

        for record in slice {
            if token.is_cancelled() {
                return Err(RelayError::Cancelled);
            }

            let message = TransportMessage::from_record(record)?;
            self.check_fits(&message)?;

            if let Err(message) = batch.try_add(message) {
                let sealed = std::mem::replace(&mut batch, self.open_batch());
                self.dispatch(&mut dispatches, sealed, token);
                report.batches += 1;
                batch.try_add(message).map_err(|message| self.too_large(&message))?;
            }
            report.messages += 1;
        }

        if token.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        if !batch.is_empty() {
            self.dispatch(&mut dispatches, batch, token);
            report.batches += 1;
        }

        while let Some(joined) = dispatches.join_next().await {
            let outcome = joined.map_err(|e| {
                if e.is_cancelled() {
                    RelayError::Cancelled
                } else {
                    RelayError::TaskFailed(e.to_string())
                }
            });
            if let Err(error) = outcome.and_then(|sent| sent) {
                dispatches.abort_all();
                return Err(error);
            }
        }

        debug!(
            messages = report.messages,
            batches = report.batches,
            "slice dispatched"
        );
        Ok(report)
    }

    fn open_batch(&self) -> MessageBatch {
        MessageBatch::new(self.max_batch_bytes, self.max_batch_count)
    }

    fn check_fits(&self, message: &TransportMessage) -> Result<(), RelayError> {
        if message.size_in_bytes() > self.max_batch_bytes {
            return Err(self.too_large(message));
        }
        Ok(())
    }

    fn too_large(&self, message: &TransportMessage) -> RelayError {
        RelayError::MessageTooLarge {
            message_id: message.message_id.clone(),
            size: message.size_in_bytes(),
            budget: self.max_batch_bytes,
        }
    }

    fn dispatch(
        &self,
        dispatches: &mut JoinSet<Result<(), RelayError>>,
        batch: MessageBatch,
        token: &CancellationToken,
    ) {
        let sender = self.senders.next();
        let metrics = Arc::clone(&self.metrics);
        let token = token.clone();

        let span = info_span!(
            "send_batch",
            messages = batch.len(),
            bytes = batch.size_in_bytes()
        );
        let send = async move {
            let count = batch.len();
            tokio::select! {
                _ = token.cancelled() => Err(RelayError::Cancelled),
                sent = sender.send_batch(batch) => match sent {
                    Ok(()) => {
                        metrics.increment_published(count);
                        Ok(())
                    }
                    Err(error) => {
                        metrics.increment_failed(count);
                        Err(error.into())
                    }
                },
            }
        };
        dispatches.spawn(send.instrument(span));
    }
}
