use std::sync::Arc;

use tracing::warn;

use super::{OutboxRecord, OutboxStore, Snapshot, StoreError, Transaction};

/// Caller-side scope for one unit of work against an [`OutboxStore`].
///
/// `start_transaction` is re-entrant: it is a no-op while a transaction is
/// already open. `commit` and `abort` without an open transaction fail with
/// [`StoreError::NoTransaction`].
///
/// A session dropped with its transaction still open aborts it on a spawned
/// task, so an abandoned cycle never leaves staged retirements behind.
pub struct OutboxSession {
    store: Arc<dyn OutboxStore>,
    transaction: Option<Transaction>,
}

impl OutboxSession {
    pub fn new(store: Arc<dyn OutboxStore>) -> Self {
        OutboxSession {
            store,
            transaction: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.transaction.is_some()
    }

    pub async fn start_transaction(&mut self) -> Result<(), StoreError> {
        if self.transaction.is_none() {
            self.transaction = Some(self.store.start_transaction().await?);
        }
        Ok(())
    }

    pub async fn find_messages(
        &self,
        limit: usize,
        page_size: usize,
    ) -> Result<Snapshot, StoreError> {
        let tx = self.open_transaction()?;
        self.store.find_messages(tx, limit, page_size).await
    }

    pub async fn retire_chunks(
        &self,
        records: &[OutboxRecord],
        chunk_size: usize,
    ) -> Result<u64, StoreError> {
        let tx = self.open_transaction()?;
        self.store.retire_chunks(tx, records, chunk_size).await
    }

    pub async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.transaction.take().ok_or(StoreError::NoTransaction)?;
        self.store.commit(tx).await
    }

    pub async fn abort(&mut self) -> Result<(), StoreError> {
        let tx = self.transaction.take().ok_or(StoreError::NoTransaction)?;
        self.store.abort(tx).await
    }

    fn open_transaction(&self) -> Result<&Transaction, StoreError> {
        self.transaction.as_ref().ok_or(StoreError::NoTransaction)
    }
}

impl Drop for OutboxSession {
    fn drop(&mut self) {
        let Some(tx) = self.transaction.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(transaction = tx.id(), "outbox session dropped outside a runtime, transaction left open");
            return;
        };

        warn!(transaction = tx.id(), "outbox session dropped with open transaction, aborting");
        let store = Arc::clone(&self.store);
        runtime.spawn(async move {
            if let Err(error) = store.abort(tx).await {
                warn!(error = %error, "failed to abort abandoned outbox transaction");
            }
        });
    }
}
