//! Outbox backlog access.
//!
//! Producers append [`OutboxRecord`]s as part of their business transaction.
//! The relay reads them back through an [`OutboxStore`] inside a transaction,
//! forwards them, and retires them by id range:
//!
//! ```text
//! start_transaction ─▶ find_messages ─▶ (dispatch) ─▶ retire_chunks ─▶ commit
//!                                            │
//!                                            └─ failure ─▶ abort (nothing retired)
//! ```
//!
//! Because ids are time-ordered, "retire this run of records" is expressed as
//! a delete over `[first.id, last.id]` instead of an explicit id list.

mod error;
mod in_memory;
mod record;
mod session;
mod store;

pub use error::StoreError;
pub use in_memory::InMemoryOutboxStore;
pub use record::{IdRange, OutboxRecord, Snapshot};
pub use session::OutboxSession;
pub use store::{OutboxStore, Transaction, RETIRE_CHUNK_SIZE};
