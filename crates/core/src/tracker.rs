//! Saved / time-since-save bookkeeping
//!
//! Combines the accepted-change ids with the completed-save ids:
//! - `saved` is true when the latest change id has been completed
//! - `since_save` restarts at 0 on every completion and counts seconds

use crate::sequence::SequenceId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Interval at which the since-save counter advances
pub const SINCE_SAVE_TICK: Duration = Duration::from_secs(1);

/// How completions that arrive out of order are folded together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionOrder {
    /// Highest completed id wins; a late completion for an older save
    /// cannot regress `saved`
    #[default]
    HighestWins,
    /// Most recently arrived completion wins, even if it is older
    LastArrived,
}

/// Status changes produced by a save completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completed {
    /// New `saved` value, if it changed
    pub saved: Option<bool>,
    /// Restarted since-save counter (always 0)
    pub since_save: u64,
}

/// Derives `saved` and `since_save` from change and completion ids
#[derive(Debug)]
pub struct SaveStatusTracker {
    order: CompletionOrder,
    latest_change: SequenceId,
    completed: Option<SequenceId>,
    /// Last emitted `saved` value
    saved: Option<bool>,
    /// (count, next tick) once the first completion has arrived
    since_save: Option<(u64, Instant)>,
}

impl SaveStatusTracker {
    /// Create a tracker with no changes and no completions
    pub fn new(order: CompletionOrder) -> Self {
        Self {
            order,
            latest_change: SequenceId::ZERO,
            completed: None,
            saved: None,
            since_save: None,
        }
    }

    /// Record a newly accepted change; returns `saved` if it changed
    pub fn on_change(&mut self, id: SequenceId) -> Option<bool> {
        self.latest_change = id;
        self.recompute()
    }

    /// Record a completed save and restart the since-save counter
    pub fn on_completion(&mut self, id: SequenceId, now: Instant) -> Completed {
        let completed = match (self.order, self.completed) {
            (CompletionOrder::HighestWins, Some(previous)) => previous.max(id),
            _ => id,
        };
        self.completed = Some(completed);
        self.since_save = Some((0, now + SINCE_SAVE_TICK));

        Completed {
            saved: self.recompute(),
            since_save: 0,
        }
    }

    /// When the since-save counter next advances
    pub fn next_tick(&self) -> Option<Instant> {
        self.since_save.map(|(_, next)| next)
    }

    /// Advance the since-save counter if its tick is due
    pub fn tick(&mut self, now: Instant) -> Option<u64> {
        let (count, next) = self.since_save.as_mut()?;
        if *next > now {
            return None;
        }

        *count += 1;
        *next += SINCE_SAVE_TICK;
        Some(*count)
    }

    /// Whether the latest change has been saved
    pub fn is_saved(&self) -> bool {
        self.saved.unwrap_or(false)
    }

    /// Latest accepted change id
    pub fn latest_change(&self) -> SequenceId {
        self.latest_change
    }

    /// Completed id the `saved` comparison currently uses
    pub fn latest_completed(&self) -> Option<SequenceId> {
        self.completed
    }

    fn recompute(&mut self) -> Option<bool> {
        // Nothing to compare until the first completion arrives
        let completed = self.completed?;
        let saved = completed == self.latest_change;

        if self.saved == Some(saved) {
            return None;
        }
        self.saved = Some(saved);
        Some(saved)
    }
}
