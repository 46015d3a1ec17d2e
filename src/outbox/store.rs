use async_trait::async_trait;
use uuid::Uuid;

use super::{OutboxRecord, Snapshot, StoreError};

/// Maximum number of records covered by one range deletion when a snapshot is
/// retired in chunks.
pub const RETIRE_CHUNK_SIZE: usize = 500;

/// Handle to an open unit of work.
///
/// Returned by [`OutboxStore::start_transaction`] and passed explicitly into
/// every later call. It is consumed by `commit` or `abort`, so a finished
/// transaction cannot be reused.
#[derive(Debug, PartialEq, Eq)]
pub struct Transaction {
    id: u64,
}

impl Transaction {
    /// Wrap a store-assigned transaction id. Intended for store implementations.
    pub fn new(id: u64) -> Self {
        Transaction { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Transactional access to the outbox backlog.
///
/// The store keeps no notion of a "current" transaction: every operation is
/// scoped by the handle it is given, so one store can serve concurrent
/// callers. Implementations might sit on MongoDB sessions, Postgres
/// transactions, etc.; `InMemoryOutboxStore` is the default.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Open a unit of work.
    async fn start_transaction(&self) -> Result<Transaction, StoreError>;

    /// Read up to `limit` records in ascending id order, fetching `page_size`
    /// records per round trip, and return them fully materialized. A page
    /// shorter than requested ends the read.
    async fn find_messages(
        &self,
        tx: &Transaction,
        limit: usize,
        page_size: usize,
    ) -> Result<Snapshot, StoreError>;

    /// Delete every record whose id lies in `[first, last]`.
    /// Returns the number of records deleted.
    async fn retire_range(
        &self,
        tx: &Transaction,
        first: Uuid,
        last: Uuid,
    ) -> Result<u64, StoreError>;

    /// Delete an ordered run of records as a series of range deletions, each
    /// covering at most `chunk_size` records.
    ///
    /// Default implementation issues one `retire_range` per chunk.
    /// Implementations may override to send the chunks as one bulk write.
    async fn retire_chunks(
        &self,
        tx: &Transaction,
        records: &[OutboxRecord],
        chunk_size: usize,
    ) -> Result<u64, StoreError> {
        let mut retired = 0;
        for chunk in records.chunks(chunk_size.max(1)) {
            let (first, last) = (&chunk[0], &chunk[chunk.len() - 1]);
            retired += self.retire_range(tx, first.id, last.id).await?;
        }
        Ok(retired)
    }

    /// Make the transaction's retirements durable.
    async fn commit(&self, tx: Transaction) -> Result<(), StoreError>;

    /// Discard the transaction's retirements.
    async fn abort(&self, tx: Transaction) -> Result<(), StoreError>;
}
