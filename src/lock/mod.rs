//! Distributed lock that serializes relay cycles across replicas.
//!
//! The lock is a lease: a conditional write into a shared [`LeaseStore`]
//! that succeeds only when no unexpired lease exists for the lock id. Waiters
//! sleep on a release signal (bumped on every release) instead of polling,
//! and still retry on a bounded interval so an expired lease is noticed.
//!
//! ```text
//! acquire ─▶ try_insert ──ok──▶ Acquired(handle)
//!               │
//!             held ─▶ wait (release signal | lease expiry | retry interval)
//!               │                      │
//!               ◀──────────────────────┘  until the wait timeout ─▶ TimedOut
//! ```

mod error;
mod guard;
mod in_memory;
mod lease;
mod lease_store;
#[allow(clippy::module_inception)]
mod lock;

pub use error::LockError;
pub use guard::LockGuard;
pub use in_memory::InMemoryLeaseStore;
pub use lease::{Acquire, LockHandle, LockLease, ReleaseSignal};
pub use lease_store::LeaseStore;
pub use lock::{DistributedLock, LeaseLock, DEFAULT_RETRY_INTERVAL};
