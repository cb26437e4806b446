//! Journal-backed load/save collaborators
//!
//! sled calls block, so every journal access runs on the blocking pool.

use anyhow::{Context, Result};
use async_trait::async_trait;
use autosave_session::{Loader, Saver};
use journal::{Journal, Snapshot};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads the latest snapshot and appends a new one per save
#[derive(Clone)]
pub struct JournalStore {
    journal: Arc<Journal>,
    last_saved: Arc<Mutex<Option<Snapshot>>>,
}

impl JournalStore {
    /// Open (or create) the journal in `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        let journal = Journal::open(dir).context("Failed to open snapshot journal")?;

        Ok(Self {
            journal: Arc::new(journal),
            last_saved: Arc::new(Mutex::new(None)),
        })
    }

    /// Underlying journal
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Snapshot written by the most recent successful save of this process
    pub fn last_saved(&self) -> Option<Snapshot> {
        self.last_saved.lock().clone()
    }
}

#[async_trait]
impl Loader<Value> for JournalStore {
    /// Latest snapshot's document, or `null` for an empty journal
    async fn load(&self) -> Result<Value> {
        let journal = Arc::clone(&self.journal);
        let latest = tokio::task::spawn_blocking(move || journal.latest())
            .await
            .context("Load task panicked")??;

        match latest {
            Some(snapshot) => {
                debug!("Loaded snapshot {} ({})", snapshot.seq, snapshot.id);
                Ok(snapshot.value)
            }
            None => {
                debug!("Journal is empty; starting from null");
                Ok(Value::Null)
            }
        }
    }
}

#[async_trait]
impl Saver<Value> for JournalStore {
    async fn save(&self, value: Value) -> Result<()> {
        let journal = Arc::clone(&self.journal);
        let snapshot = tokio::task::spawn_blocking(move || journal.append(&value))
            .await
            .context("Save task panicked")??;

        info!("Saved snapshot {} ({})", snapshot.seq, snapshot.id);
        *self.last_saved.lock() = Some(snapshot);
        Ok(())
    }
}
