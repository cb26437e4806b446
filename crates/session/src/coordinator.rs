//! Save invocation
//!
//! Samples the latest (value, id) pair whenever a window closes and runs
//! the saver for it on its own task. Several saves may be in flight; their
//! outcomes come back over a channel in whatever order they finish.

use crate::collab::Saver;
use autosave_core::{SaveRequest, SequenceId, WindowEnd};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Result of one save invocation
#[derive(Debug)]
pub enum SaveOutcome {
    /// The value carrying this id was saved
    Completed(SequenceId),
    /// The save failed and will not be retried
    Failed {
        id: SequenceId,
        error: anyhow::Error,
    },
}

/// Turns window ends into save invocations
pub struct SaveCoordinator<P> {
    saver: Arc<dyn Saver<P>>,
    /// Latest accepted value and its id
    latest: Option<(P, SequenceId)>,
    outcomes: mpsc::UnboundedSender<SaveOutcome>,
    in_flight: Arc<AtomicUsize>,
}

impl<P> SaveCoordinator<P>
where
    P: Clone + Send + 'static,
{
    /// Create a coordinator reporting to `outcomes`
    pub fn new(saver: Arc<dyn Saver<P>>, outcomes: mpsc::UnboundedSender<SaveOutcome>) -> Self {
        Self {
            saver,
            latest: None,
            outcomes,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Remember the latest accepted change
    pub fn record(&mut self, value: P, id: SequenceId) {
        self.latest = Some((value, id));
    }

    /// Id of the latest accepted change (baseline if none)
    pub fn latest_id(&self) -> SequenceId {
        self.latest
            .as_ref()
            .map_or(SequenceId::ZERO, |(_, id)| *id)
    }

    /// Capture the latest change and start saving it.
    ///
    /// Returns `None` when nothing has changed since activation.
    pub fn close_window(&mut self, end: WindowEnd) -> Option<SaveRequest<P>> {
        let Some((value, id)) = self.latest.as_ref() else {
            debug!("Save window closed ({:?}) with no changes; nothing to save", end.trigger);
            return None;
        };

        let request = SaveRequest {
            value: value.clone(),
            id: *id,
            trigger: end.trigger,
        };
        self.spawn_save(request.value.clone(), request.id);
        Some(request)
    }

    /// Number of saves that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn spawn_save(&self, value: P, id: SequenceId) {
        let saver = Arc::clone(&self.saver);
        let outcomes = self.outcomes.clone();
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let outcome = match saver.save(value).await {
                Ok(()) => SaveOutcome::Completed(id),
                Err(error) => SaveOutcome::Failed { id, error },
            };
            in_flight.fetch_sub(1, Ordering::SeqCst);

            // Receiver is gone once the session is torn down
            let _ = outcomes.send(outcome);
        });
    }
}
