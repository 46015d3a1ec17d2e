use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ownership record stored for a held lock.
///
/// At most one unexpired lease exists per `lock_id`. An expired lease is dead
/// without anyone deleting it, which is what lets a crashed holder self-heal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockLease {
    pub lock_id: String,
    pub owner: String,
    /// Distinguishes successive leases taken by the same owner.
    pub lease_id: Uuid,
    pub expires_at: SystemTime,
}

impl LockLease {
    pub fn new(lock_id: impl Into<String>, owner: impl Into<String>, expires_at: SystemTime) -> Self {
        LockLease {
            lock_id: lock_id.into(),
            owner: owner.into(),
            lease_id: Uuid::new_v4(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at <= now
    }
}

/// Wake-up marker bumped on every release of a lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSignal {
    pub lock_id: String,
    pub version: u64,
}

/// Proof of a successful acquire, valid until released or expired.
#[derive(Debug, PartialEq, Eq)]
pub struct LockHandle {
    lease: LockLease,
}

impl LockHandle {
    pub fn new(lease: LockLease) -> Self {
        LockHandle { lease }
    }

    pub fn lock_id(&self) -> &str {
        &self.lease.lock_id
    }

    pub fn owner(&self) -> &str {
        &self.lease.owner
    }

    pub fn lease_id(&self) -> Uuid {
        self.lease.lease_id
    }

    pub fn expires_at(&self) -> SystemTime {
        self.lease.expires_at
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.lease.is_expired(now)
    }
}

/// Outcome of an acquire attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Acquire {
    Acquired(LockHandle),
    /// The lock stayed held by someone else for the whole wait timeout.
    TimedOut,
}
