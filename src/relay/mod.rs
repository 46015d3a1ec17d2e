//! The relay engine.
//!
//! Each tick takes the distributed lock, reads an ordered snapshot inside a
//! transaction, fans it out into slices, packs every slice into broker
//! batches, and then either retires the snapshot and commits or aborts.
//!
//! ```text
//!            acquire ──timed out──────────────────────────┐
//!               │                                         │
//!               ▼                                         │
//!   start tx ─▶ find ─▶ slice ─┬─▶ batch ─▶ send          │
//!                              ├─▶ batch ─▶ send          │
//!                              └─▶ batch ─▶ send          │
//!                                        │                │
//!                      all ok: retire + commit            │
//!                      otherwise: abort                   │
//!                                        │                │
//!                                     release ─▶ delay ◀──┘
//! ```

mod batch_builder;
mod cycle;
mod metrics;
pub mod slicer;
mod worker;

pub use batch_builder::{BatchBuilder, SliceReport};
pub use cycle::{remaining_delay, CycleOutcome, CycleReport, RelayCycle};
pub use metrics::{NoopMetrics, RelayMetrics, RelayStats, StatsSnapshot};
pub use worker::RelayWorker;
