pub mod bus;
pub mod clock;
pub mod config;
mod error;
pub mod lock;
pub mod outbox;
pub mod relay;

pub use bus::{BatchSender, InMemoryBroker, LogSender, MessageBatch, SendError, SenderPool, TransportMessage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BrokerOptions, ConfigError, LockOptions, RelayOptions, StoreOptions};
pub use error::{ErrorKind, RelayError};
pub use lock::{Acquire, DistributedLock, InMemoryLeaseStore, LeaseLock, LeaseStore, LockError, LockGuard, LockHandle};
pub use outbox::{InMemoryOutboxStore, OutboxRecord, OutboxSession, OutboxStore, Snapshot, StoreError, Transaction};
pub use relay::{
    BatchBuilder, CycleOutcome, CycleReport, NoopMetrics, RelayCycle, RelayMetrics, RelayStats,
    RelayWorker, StatsSnapshot,
};

#[cfg(feature = "emitter")]
pub use bus::EmitterSender;

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;

// Re-export the cancellation token the relay loop is driven by
pub use tokio_util::sync::CancellationToken;
