use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Durable domain event waiting to be relayed to the broker.
///
/// Ids are version-7 UUIDs, so ascending id order follows insertion order and
/// a contiguous run of records is fully described by its first and last id.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboxRecord {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub subject: String,
    pub body: Value,
}

impl OutboxRecord {
    /// Create a record with a fresh time-ordered id.
    pub fn new(correlation_id: Uuid, subject: impl Into<String>, body: Value) -> Self {
        OutboxRecord {
            id: Uuid::now_v7(),
            correlation_id,
            subject: subject.into(),
            body,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}

/// Ordered, materialized read of the backlog taken inside one transaction.
pub type Snapshot = Vec<OutboxRecord>;

/// Closed id interval `[first, last]` covering a contiguous run of records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdRange {
    pub first: Uuid,
    pub last: Uuid,
}

impl IdRange {
    pub fn new(first: Uuid, last: Uuid) -> Self {
        IdRange { first, last }
    }

    /// Range spanned by an ordered run of records, `None` when it is empty.
    pub fn of(records: &[OutboxRecord]) -> Option<Self> {
        match (records.first(), records.last()) {
            (Some(first), Some(last)) => Some(IdRange::new(first.id, last.id)),
            _ => None,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.first <= *id && *id <= self.last
    }
}
