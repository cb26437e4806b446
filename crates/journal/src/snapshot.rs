//! Snapshot records

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// One saved JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Journal sequence number (monotonic, starts at 1)
    pub seq: u64,
    /// Unique ID (ULID for timestamp + uniqueness)
    pub id: Ulid,
    /// Timestamp (Unix milliseconds)
    pub saved_at_ms: u64,
    /// Saved document
    pub value: Value,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(seq: u64, value: Value) -> Self {
        let id = Ulid::new();
        Self {
            seq,
            id,
            saved_at_ms: id.timestamp_ms(),
            value,
        }
    }

    /// Serialize for storage
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize snapshot")
    }

    /// Deserialize from storage
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Failed to deserialize snapshot")
    }
}
