//! Append-only snapshot journal using sled

use crate::Snapshot;
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde_json::Value;
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use ulid::Ulid;

/// Append-only journal for snapshots
pub struct Journal {
    /// Sled database, keyed by big-endian sequence number
    db: Db,
    /// In-memory index: snapshot_id -> sequence_number
    index: RwLock<BTreeMap<Ulid, u64>>,
    /// Monotonic sequence counter
    seq_counter: AtomicU64,
}

impl Journal {
    /// Open or create a journal in the given directory
    pub fn open(path: &Path) -> Result<Self> {
        let db_path = path.join("snapshots.db");
        let db = sled::open(&db_path)
            .with_context(|| format!("Failed to open journal at {}", db_path.display()))?;

        // Build in-memory index on startup
        let mut index = BTreeMap::new();
        let mut max_seq = 0u64;

        for item in db.iter() {
            let (key, value) = item?;
            let seq = decode_key(&key)?;
            let snapshot = Snapshot::deserialize(&value)?;
            index.insert(snapshot.id, seq);
            max_seq = max_seq.max(seq);
        }

        debug!(
            "Opened journal at {} ({} snapshots)",
            db_path.display(),
            index.len()
        );

        Ok(Self {
            db,
            index: RwLock::new(index),
            seq_counter: AtomicU64::new(max_seq + 1),
        })
    }

    /// Append a document to the journal
    pub fn append(&self, value: &Value) -> Result<Snapshot> {
        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        let snapshot = Snapshot::new(seq, value.clone());

        self.db.insert(seq.to_be_bytes(), snapshot.serialize()?)?;

        // Update index
        self.index.write().insert(snapshot.id, seq);

        // Flush to ensure durability
        self.db.flush()?;

        debug!("Appended snapshot {} ({})", seq, snapshot.id);
        Ok(snapshot)
    }

    /// Get a snapshot by ID
    pub fn get(&self, id: &Ulid) -> Result<Option<Snapshot>> {
        let seq = match self.index.read().get(id) {
            Some(&seq) => seq,
            None => return Ok(None),
        };

        match self.db.get(seq.to_be_bytes())? {
            Some(value) => Ok(Some(Snapshot::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get the latest snapshot
    pub fn latest(&self) -> Result<Option<Snapshot>> {
        match self.db.last()? {
            Some((_, value)) => Ok(Some(Snapshot::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get the last N snapshots, oldest first
    pub fn last_n(&self, count: usize) -> Result<Vec<Snapshot>> {
        let mut snapshots = self
            .db
            .iter()
            .rev()
            .take(count)
            .map(|item| {
                let (_, value) = item?;
                Snapshot::deserialize(&value)
            })
            .collect::<Result<Vec<_>>>()?;

        snapshots.reverse();
        Ok(snapshots)
    }

    /// Get snapshots saved at or after a timestamp
    pub fn since(&self, timestamp_ms: u64) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for item in self.db.iter() {
            let (_, value) = item?;
            let snapshot = Snapshot::deserialize(&value)?;
            if snapshot.saved_at_ms >= timestamp_ms {
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }

    /// Get the total number of snapshots
    pub fn count(&self) -> usize {
        self.index.read().len()
    }
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .with_context(|| format!("Malformed journal key ({} bytes)", key.len()))?;
    Ok(u64::from_be_bytes(bytes))
}
