//! Save window boundaries
//!
//! A window closes when `frequency` passes after the last accepted change
//! with no further change, or when a manual save is requested. The
//! scheduler only decides *when*; the value to save is sampled by the
//! coordinator at the moment the window closes.

use crate::error::{AutosaveError, Result};
use crate::sequence::SequenceId;
use std::time::Duration;
use tokio::time::Instant;

/// What closed a save window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTrigger {
    /// Quiet period after the last change elapsed
    Debounce,
    /// Explicit manual save
    Manual,
}

/// Signal that the current save window has ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEnd {
    /// Cause of the close
    pub trigger: WindowTrigger,
    /// Instant the window closed
    pub at: Instant,
}

/// Debounce + manual-save window scheduler
#[derive(Debug)]
pub struct SaveWindowScheduler {
    frequency: Duration,
    /// Pending debounce expiry, if a change is waiting
    deadline: Option<Instant>,
    /// Instant and latest id of the previous close, used to fold
    /// simultaneous triggers into one window end
    last_close: Option<(Instant, SequenceId)>,
}

impl SaveWindowScheduler {
    /// Create a scheduler with the given debounce interval
    pub fn new(frequency: Duration) -> Result<Self> {
        if frequency.is_zero() {
            return Err(AutosaveError::InvalidFrequency);
        }

        Ok(Self {
            frequency,
            deadline: None,
            last_close: None,
        })
    }

    /// Debounce interval
    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// Restart the quiet period for an accepted change
    pub fn on_change(&mut self, now: Instant) {
        self.deadline = Some(now + self.frequency);
    }

    /// When the pending debounce expires
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Close the window if the debounce deadline has passed
    pub fn poll_deadline(&mut self, now: Instant, latest: SequenceId) -> Option<WindowEnd> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.close(WindowTrigger::Debounce, now, latest)
            }
            _ => None,
        }
    }

    /// Close the window for a manual save, cancelling any pending debounce
    pub fn manual(&mut self, now: Instant, latest: SequenceId) -> Option<WindowEnd> {
        self.deadline = None;
        self.close(WindowTrigger::Manual, now, latest)
    }

    fn close(&mut self, trigger: WindowTrigger, now: Instant, latest: SequenceId) -> Option<WindowEnd> {
        // Same instant and nothing new accepted in between: one window end
        if self.last_close == Some((now, latest)) {
            return None;
        }

        self.last_close = Some((now, latest));
        Some(WindowEnd { trigger, at: now })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_zero_frequency_rejected() {
        assert!(matches!(
            SaveWindowScheduler::new(Duration::ZERO),
            Err(AutosaveError::InvalidFrequency)
        ));
    }

    #[test]
    fn test_debounce_restarts_on_each_change() {
        let t0 = Instant::now();
        let mut scheduler = SaveWindowScheduler::new(ms(1000)).unwrap();
        assert_eq!(scheduler.deadline(), None);

        scheduler.on_change(t0);
        assert_eq!(scheduler.deadline(), Some(t0 + ms(1000)));

        // Another change 600ms later pushes the deadline out
        scheduler.on_change(t0 + ms(600));
        assert_eq!(scheduler.deadline(), Some(t0 + ms(1600)));

        // Original deadline passes without closing the window
        assert_eq!(scheduler.poll_deadline(t0 + ms(1000), SequenceId::new(2)), None);

        let end = scheduler
            .poll_deadline(t0 + ms(1600), SequenceId::new(2))
            .unwrap();
        assert_eq!(end.trigger, WindowTrigger::Debounce);
        assert_eq!(end.at, t0 + ms(1600));
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn test_manual_save_cancels_pending_debounce() {
        let t0 = Instant::now();
        let mut scheduler = SaveWindowScheduler::new(ms(1000)).unwrap();

        scheduler.on_change(t0);
        let end = scheduler.manual(t0 + ms(10), SequenceId::new(1)).unwrap();
        assert_eq!(end.trigger, WindowTrigger::Manual);

        assert_eq!(scheduler.deadline(), None);
        assert_eq!(scheduler.poll_deadline(t0 + ms(1000), SequenceId::new(1)), None);
    }

    #[test]
    fn test_simultaneous_triggers_fold_into_one() {
        let t0 = Instant::now();
        let mut scheduler = SaveWindowScheduler::new(ms(1000)).unwrap();
        let latest = SequenceId::new(1);

        scheduler.on_change(t0);
        let deadline = t0 + ms(1000);

        assert!(scheduler.poll_deadline(deadline, latest).is_some());
        assert!(scheduler.manual(deadline, latest).is_none());

        // A later manual save is a new window
        assert!(scheduler.manual(deadline + ms(1), latest).is_some());
    }

    #[test]
    fn test_same_instant_with_new_change_is_new_window() {
        let t0 = Instant::now();
        let mut scheduler = SaveWindowScheduler::new(ms(1000)).unwrap();

        assert!(scheduler.manual(t0, SequenceId::new(1)).is_some());
        assert!(scheduler.manual(t0, SequenceId::new(2)).is_some());
    }

    #[test]
    fn test_manual_without_changes_still_signals() {
        // Whether anything gets saved is the coordinator's call
        let mut scheduler = SaveWindowScheduler::new(ms(1000)).unwrap();
        assert!(scheduler.manual(Instant::now(), SequenceId::ZERO).is_some());
    }
}
