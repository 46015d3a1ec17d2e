//! Test doubles for relay integration tests.
//!
//! - `SpyStore` wraps `InMemoryOutboxStore`, counts every call, and can
//!   delay reads or fail the next read or commit.
//! - `FlakySender` fails a fixed number of sends before forwarding to an
//!   `InMemoryBroker`.
//! - `SpanRecorder` collects the name and parent of every span opened while
//!   it is the thread's default subscriber.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use outbox_relay::config::{BrokerOptions, LockOptions, StoreOptions};
use outbox_relay::{
    BatchSender, DistributedLock, InMemoryBroker, InMemoryLeaseStore, InMemoryOutboxStore,
    LeaseLock, MessageBatch, OutboxRecord, OutboxStore, RelayCycle, RelayMetrics, RelayOptions,
    RelayStats, SendError, SenderPool, Snapshot, StoreError, Transaction,
};
use serde_json::json;
use tracing::span;
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;
use uuid::Uuid;

pub const ENTITY: &str = "orders-topic";
pub const LOCK_ID: &str = "outbox-relay";

/// Smallest valid options: one slice, batches of ten, one second ticks.
pub fn options() -> RelayOptions {
    RelayOptions {
        store: StoreOptions {
            database_name: "orders-db".into(),
            read_limit: 100,
            page_size: 100,
        },
        broker: BrokerOptions {
            entity_name: ENTITY.into(),
            batch_byte_budget: 262_144,
            batch_message_count: 10,
            sender_count: 1,
        },
        lock: LockOptions {
            lock_id: LOCK_ID.into(),
            lease_lifetime_seconds: 30,
            acquire_timeout_seconds: 1,
        },
        tick_interval_ms: 1_000,
        max_degree_of_parallelism: 1,
    }
}

/// `count` records with ascending ids, as producers would append them.
pub fn records(count: usize) -> Vec<OutboxRecord> {
    (0..count)
        .map(|n| {
            OutboxRecord::new(
                Uuid::new_v4(),
                "OrderPlaced",
                json!({ "orderId": format!("order-{n}"), "total": n * 10 }),
            )
        })
        .collect()
}

/// Insert `count` records and return them in id order.
pub fn seed(store: &InMemoryOutboxStore, count: usize) -> Vec<OutboxRecord> {
    let records = records(count);
    store.insert_many(records.clone()).unwrap();
    records
}

pub fn ids(records: &[OutboxRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.to_string()).collect()
}

pub fn sorted_message_ids(broker: &InMemoryBroker) -> Vec<String> {
    let mut ids: Vec<String> = broker
        .messages()
        .into_iter()
        .map(|m| m.message_id)
        .collect();
    ids.sort();
    ids
}

/// Everything one relay replica needs, wired over shared backends.
pub struct Replica {
    pub cycle: RelayCycle,
    pub stats: Arc<RelayStats>,
}

pub fn replica(
    options: RelayOptions,
    store: Arc<dyn OutboxStore>,
    lock: Arc<dyn DistributedLock>,
    senders: SenderPool,
) -> Replica {
    let stats = Arc::new(RelayStats::new());
    let metrics: Arc<dyn RelayMetrics> = stats.clone();
    let cycle = RelayCycle::new(options, store, lock, senders)
        .unwrap()
        .with_metrics(metrics);
    Replica { cycle, stats }
}

pub fn lease_lock(leases: &InMemoryLeaseStore, owner: &str) -> Arc<dyn DistributedLock> {
    Arc::new(LeaseLock::new(leases.clone()).with_owner(owner))
}

pub fn broker_pool(broker: &InMemoryBroker) -> SenderPool {
    SenderPool::replicate(Arc::new(broker.clone()), 1)
}

// =============================================================================
// SpyStore
// =============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub start: usize,
    pub find: usize,
    pub retire: usize,
    pub commit: usize,
    pub abort: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.start + self.find + self.retire + self.commit + self.abort
    }
}

#[derive(Default)]
struct Counters {
    start: AtomicUsize,
    find: AtomicUsize,
    retire: AtomicUsize,
    commit: AtomicUsize,
    abort: AtomicUsize,
    reading: AtomicUsize,
    max_reading: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    next_find: Option<StoreError>,
    next_commit: Option<StoreError>,
}

pub struct SpyStore {
    inner: InMemoryOutboxStore,
    counters: Counters,
    faults: Mutex<Faults>,
    find_delay: Option<Duration>,
}

impl SpyStore {
    pub fn new(inner: InMemoryOutboxStore) -> Self {
        Self {
            inner,
            counters: Counters::default(),
            faults: Mutex::new(Faults::default()),
            find_delay: None,
        }
    }

    /// Hold every read open for `delay` before returning it.
    pub fn with_find_delay(mut self, delay: Duration) -> Self {
        self.find_delay = Some(delay);
        self
    }

    pub fn fail_next_find(&self, error: StoreError) {
        self.faults.lock().unwrap().next_find = Some(error);
    }

    pub fn fail_next_commit(&self, error: StoreError) {
        self.faults.lock().unwrap().next_commit = Some(error);
    }

    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            start: c.start.load(Ordering::SeqCst),
            find: c.find.load(Ordering::SeqCst),
            retire: c.retire.load(Ordering::SeqCst),
            commit: c.commit.load(Ordering::SeqCst),
            abort: c.abort.load(Ordering::SeqCst),
        }
    }

    /// Highest number of reads that were in flight at the same time.
    pub fn max_concurrent_reads(&self) -> usize {
        self.counters.max_reading.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryOutboxStore {
        &self.inner
    }
}

#[async_trait]
impl OutboxStore for SpyStore {
    async fn start_transaction(&self) -> Result<Transaction, StoreError> {
        self.counters.start.fetch_add(1, Ordering::SeqCst);
        self.inner.start_transaction().await
    }

    async fn find_messages(
        &self,
        tx: &Transaction,
        limit: usize,
        page_size: usize,
    ) -> Result<Snapshot, StoreError> {
        self.counters.find.fetch_add(1, Ordering::SeqCst);
        let injected = self.faults.lock().unwrap().next_find.take();
        if let Some(error) = injected {
            return Err(error);
        }

        let reading = self.counters.reading.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_reading.fetch_max(reading, Ordering::SeqCst);
        if let Some(delay) = self.find_delay {
            tokio::time::sleep(delay).await;
        }
        let found = self.inner.find_messages(tx, limit, page_size).await;
        self.counters.reading.fetch_sub(1, Ordering::SeqCst);
        found
    }

    async fn retire_range(
        &self,
        tx: &Transaction,
        first: Uuid,
        last: Uuid,
    ) -> Result<u64, StoreError> {
        self.counters.retire.fetch_add(1, Ordering::SeqCst);
        self.inner.retire_range(tx, first, last).await
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StoreError> {
        self.counters.commit.fetch_add(1, Ordering::SeqCst);
        let injected = self.faults.lock().unwrap().next_commit.take();
        if let Some(error) = injected {
            self.inner.abort(tx).await?;
            return Err(error);
        }
        self.inner.commit(tx).await
    }

    async fn abort(&self, tx: Transaction) -> Result<(), StoreError> {
        self.counters.abort.fetch_add(1, Ordering::SeqCst);
        self.inner.abort(tx).await
    }
}

// =============================================================================
// FlakySender
// =============================================================================

pub struct FlakySender {
    broker: InMemoryBroker,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakySender {
    /// Fail the first `failures` sends, then deliver to `broker`.
    pub fn new(broker: InMemoryBroker, failures: usize) -> Self {
        Self {
            broker,
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchSender for FlakySender {
    async fn send_batch(&self, batch: MessageBatch) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SendError::ConnectionFailed("broker unreachable".into()));
        }
        self.broker.send_batch(batch).await
    }
}

// =============================================================================
// SpanRecorder
// =============================================================================

/// A span as seen by `SpanRecorder`: its name and its parent's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedSpan {
    pub name: &'static str,
    pub parent: Option<&'static str>,
}

#[derive(Clone, Default)]
pub struct SpanRecorder {
    spans: Arc<Mutex<Vec<OpenedSpan>>>,
}

impl SpanRecorder {
    /// Install the recorder for the current thread until the guard drops.
    pub fn install() -> (Self, DefaultGuard) {
        let recorder = SpanRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (recorder, guard)
    }

    pub fn spans(&self) -> Vec<OpenedSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub fn named(&self, name: &str) -> Vec<OpenedSpan> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }
}

impl<S> Layer<S> for SpanRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let parent = ctx
            .span(id)
            .and_then(|span| span.parent())
            .map(|parent| parent.name());
        self.spans.lock().unwrap().push(OpenedSpan {
            name: attrs.metadata().name(),
            parent,
        });
    }
}
