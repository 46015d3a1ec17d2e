//! Relay configuration.
//!
//! Options are bound from the host's configuration (JSON, camelCase keys) and
//! validated against the ranges the relay is designed for. Loading them from
//! files or the environment is left to the host.
//!
//! ```
//! use outbox_relay::config::RelayOptions;
//!
//! let options = RelayOptions::from_json_str(r#"{
//!     "store": { "databaseName": "orders-db", "readLimit": 1000, "pageSize": 500 },
//!     "broker": { "entityName": "orders-topic", "batchMessageCount": 100, "senderCount": 4 },
//!     "lock": { "leaseLifetimeSeconds": 30, "acquireTimeoutSeconds": 5 },
//!     "tickIntervalMs": 2000,
//!     "maxDegreeOfParallelism": 4
//! }"#).unwrap();
//!
//! assert_eq!(options.slice_size(), 250);
//! assert_eq!(options.broker.batch_byte_budget, 262_144);
//! ```

mod error;

pub use error::ConfigError;

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default broker batch size budget (256 KiB).
pub const DEFAULT_BATCH_BYTE_BUDGET: usize = 262_144;

/// Default identity of the relay's distributed lock.
pub const DEFAULT_LOCK_ID: &str = "outbox-relay";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOptions {
    pub database_name: String,
    /// Maximum number of records read per cycle.
    pub read_limit: usize,
    /// Cursor page size used while materializing a snapshot.
    pub page_size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerOptions {
    pub entity_name: String,
    #[serde(default = "default_batch_byte_budget")]
    pub batch_byte_budget: usize,
    pub batch_message_count: usize,
    pub sender_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOptions {
    #[serde(default = "default_lock_id")]
    pub lock_id: String,
    pub lease_lifetime_seconds: u64,
    pub acquire_timeout_seconds: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayOptions {
    pub store: StoreOptions,
    pub broker: BrokerOptions,
    pub lock: LockOptions,
    pub tick_interval_ms: u64,
    pub max_degree_of_parallelism: usize,
}

fn default_batch_byte_budget() -> usize {
    DEFAULT_BATCH_BYTE_BUDGET
}

fn default_lock_id() -> String {
    DEFAULT_LOCK_ID.to_string()
}

impl RelayOptions {
    /// Parse options from a JSON document and validate them.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: RelayOptions =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_length("store.databaseName", &self.store.database_name, 6..=64)?;
        check_range("store.readLimit", self.store.read_limit as u64, 100..=10_000)?;
        check_range("store.pageSize", self.store.page_size as u64, 100..=10_000)?;

        check_length("broker.entityName", &self.broker.entity_name, 6..=64)?;
        check_range(
            "broker.batchByteBudget",
            self.broker.batch_byte_budget as u64,
            1..=u64::MAX,
        )?;
        check_range(
            "broker.batchMessageCount",
            self.broker.batch_message_count as u64,
            1..=500,
        )?;
        check_range("broker.senderCount", self.broker.sender_count as u64, 1..=32)?;

        if self.lock.lock_id.is_empty() {
            return Err(ConfigError::InvalidLength {
                field: "lock.lockId",
                length: 0,
                min: 1,
                max: usize::MAX,
            });
        }
        check_range(
            "lock.leaseLifetimeSeconds",
            self.lock.lease_lifetime_seconds,
            10..=60,
        )?;
        check_range(
            "lock.acquireTimeoutSeconds",
            self.lock.acquire_timeout_seconds,
            1..=30,
        )?;

        check_range("tickIntervalMs", self.tick_interval_ms, 1_000..=10_000)?;
        check_range(
            "maxDegreeOfParallelism",
            self.max_degree_of_parallelism as u64,
            1..=32,
        )?;
        Ok(())
    }

    /// Nominal slice size for a full read: `readLimit / maxDegreeOfParallelism`.
    pub fn slice_size(&self) -> usize {
        self.store.read_limit / self.max_degree_of_parallelism.max(1)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn lease_lifetime(&self) -> Duration {
        Duration::from_secs(self.lock.lease_lifetime_seconds)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.lock.acquire_timeout_seconds)
    }
}

fn check_range(
    field: &'static str,
    value: u64,
    range: RangeInclusive<u64>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn check_length(
    field: &'static str,
    value: &str,
    range: RangeInclusive<usize>,
) -> Result<(), ConfigError> {
    let length = value.chars().count();
    if range.contains(&length) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLength {
            field,
            length,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
