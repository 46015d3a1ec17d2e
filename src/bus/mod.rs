//! Broker side of the relay.
//!
//! Records become [`TransportMessage`]s, messages are packed into
//! [`MessageBatch`]es bounded by bytes and count, and sealed batches go out
//! through a [`SenderPool`] of [`BatchSender`]s.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 SenderPool (round-robin)                  │
//! │  next() ─▶ sender[0] ─▶ sender[1] ─▶ ... ─▶ sender[n-1]   │
//! └───────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │              BatchSender::send_batch(batch)               │
//! └───────────────────────────────────────────────────────────┘
//!          │                  │                     │
//!          ▼                  ▼                     ▼
//! ┌───────────────┐   ┌─────────────┐   ┌─────────────────────┐
//! │InMemoryBroker │   │  LogSender  │   │ Service Bus / Kafka │
//! │  (included)   │   │ (included)  │   │     (external)      │
//! └───────────────┘   └─────────────┘   └─────────────────────┘
//! ```

mod batch;
#[cfg(feature = "emitter")]
mod emitter;
mod in_memory;
mod log;
mod message;
mod sender;

pub use batch::MessageBatch;
#[cfg(feature = "emitter")]
pub use emitter::EmitterSender;
pub use in_memory::InMemoryBroker;
pub use log::LogSender;
pub use message::{TransportMessage, CONTENT_TYPE_JSON, MESSAGE_OVERHEAD_BYTES};
pub use sender::{BatchSender, SendError, SenderPool};
