use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::{IdRange, OutboxRecord, OutboxStore, Snapshot, StoreError, Transaction};

#[derive(Default)]
struct State {
    records: BTreeMap<Uuid, OutboxRecord>,
    /// Range deletions staged by each open transaction.
    transactions: HashMap<u64, Vec<IdRange>>,
}

/// In-memory outbox store for tests and single-process use.
///
/// Cloning creates another handle to the same storage. Retirements are staged
/// per transaction and only applied on commit, so an aborted cycle leaves the
/// backlog untouched.
///
/// Reads walk the id-ordered map one page at a time, each page resuming after
/// the last id of the previous one, the way a cursor over an indexed
/// collection would.
#[derive(Clone, Default)]
pub struct InMemoryOutboxStore {
    state: Arc<Mutex<State>>,
    next_tx: Arc<AtomicU64>,
    page_reads: Arc<AtomicU64>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, as a producer's business transaction would.
    pub fn insert(&self, record: OutboxRecord) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("insert"))?;
        state.records.insert(record.id, record);
        Ok(())
    }

    pub fn insert_many(
        &self,
        records: impl IntoIterator<Item = OutboxRecord>,
    ) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("insert"))?;
        for record in records {
            state.records.insert(record.id, record);
        }
        Ok(())
    }

    /// All committed records in id order.
    pub fn records(&self) -> Result<Vec<OutboxRecord>, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("read"))?;
        Ok(state.records.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("read"))?;
        Ok(state.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Number of transactions started and not yet committed or aborted.
    pub fn open_transactions(&self) -> Result<usize, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("read"))?;
        Ok(state.transactions.len())
    }

    /// Pages fetched by `find_messages` over the store's lifetime.
    pub fn page_reads(&self) -> u64 {
        self.page_reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn start_transaction(&self) -> Result<Transaction, StoreError> {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("start transaction"))?;
        state.transactions.insert(id, Vec::new());
        Ok(Transaction::new(id))
    }

    async fn find_messages(
        &self,
        tx: &Transaction,
        limit: usize,
        page_size: usize,
    ) -> Result<Snapshot, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("find messages"))?;
        let staged = state
            .transactions
            .get(&tx.id())
            .ok_or(StoreError::UnknownTransaction(tx.id()))?;

        let page_size = page_size.max(1);
        let mut snapshot = Snapshot::new();
        let mut cursor: Option<Uuid> = None;

        while snapshot.len() < limit {
            let want = page_size.min(limit - snapshot.len());
            let lower = cursor.map_or(Bound::Unbounded, Bound::Excluded);
            let page: Vec<&OutboxRecord> = state
                .records
                .range((lower, Bound::Unbounded))
                .map(|(_, record)| record)
                .filter(|record| !staged.iter().any(|range| range.contains(&record.id)))
                .take(want)
                .collect();
            self.page_reads.fetch_add(1, Ordering::Relaxed);

            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id);
            let short = page.len() < want;
            snapshot.extend(page.into_iter().cloned());
            if short {
                break;
            }
        }

        Ok(snapshot)
    }

    async fn retire_range(
        &self,
        tx: &Transaction,
        first: Uuid,
        last: Uuid,
    ) -> Result<u64, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("retire range"))?;
        let State {
            records,
            transactions,
        } = &mut *state;
        let staged = transactions
            .get_mut(&tx.id())
            .ok_or(StoreError::UnknownTransaction(tx.id()))?;

        if first > last {
            return Ok(0);
        }

        let matched = records
            .range(first..=last)
            .filter(|(id, _)| !staged.iter().any(|range| range.contains(id)))
            .count();
        staged.push(IdRange::new(first, last));
        Ok(matched as u64)
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("commit"))?;
        let staged = state
            .transactions
            .remove(&tx.id())
            .ok_or(StoreError::UnknownTransaction(tx.id()))?;

        for range in staged {
            let ids: Vec<Uuid> = state
                .records
                .range(range.first..=range.last)
                .map(|(id, _)| *id)
                .collect();
            for id in ids {
                state.records.remove(&id);
            }
        }
        Ok(())
    }

    async fn abort(&self, tx: Transaction) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Poisoned("abort"))?;
        state
            .transactions
            .remove(&tx.id())
            .map(|_| ())
            .ok_or(StoreError::UnknownTransaction(tx.id()))
    }
}
