//! Autosave session
//!
//! [`Autosave`] owns one save-scheduling pipeline:
//!
//! ```text
//! on_change ─► ChangeFilter ─► ChangeCounter ─┐
//!                                             ├─► event loop ─► SaveCoordinator ─► Saver
//! manual_save ────────────────────────────────┘       │                │
//!                                                     │◄── outcomes ───┘
//!                                                     ▼
//!                                     SaveStatusTracker ─► SaveStatus
//! ```
//!
//! Filtering and id assignment happen at the call site under one lock so
//! ids reach the loop in order. Everything else runs on a single event-loop
//! task, so the latest-value cache has exactly one writer.

use crate::collab::{LoadState, Loader, Saver};
use crate::coordinator::{SaveCoordinator, SaveOutcome};
use crate::lifecycle::{wait_for_shutdown, LifecycleGate, Phase};
use autosave_core::{
    fallible_projection, projection, AutosaveConfig, AutosaveError, ChangeCounter, ChangeFilter,
    CompletionOrder, Projection, Result, SaveStatus, SaveStatusTracker, SaveWindowScheduler,
    SequenceId, StatusEvent, StatusKind, Subscription, WindowEnd,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace, warn};

/// What happened to a value passed to [`Autosave::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Accepted as a new change with this id
    Accepted(SequenceId),
    /// Equal to the previous change after projection
    Suppressed,
    /// Session not active; the value was dropped
    Inactive,
}

enum Input<P> {
    Change { value: P, id: SequenceId },
    ManualSave,
}

struct Intake<V, P> {
    filter: ChangeFilter<V, P>,
    counter: ChangeCounter,
}

/// Parts handed to the tasks at activation
struct Dormant<V, P> {
    inputs: mpsc::UnboundedReceiver<Input<P>>,
    loader: Arc<dyn Loader<V>>,
    saver: Arc<dyn Saver<P>>,
    scheduler: SaveWindowScheduler,
}

struct Inner<V, P> {
    config: AutosaveConfig,
    gate: LifecycleGate,
    intake: Mutex<Intake<V, P>>,
    inputs: mpsc::UnboundedSender<Input<P>>,
    dormant: Mutex<Option<Dormant<V, P>>>,
    status: Arc<SaveStatus>,
    load_state: Arc<watch::Sender<LoadState<V>>>,
}

impl<V, P> Inner<V, P> {
    fn teardown(&self) -> bool {
        // Held across the flip so no change is accepted after it
        let intake = self.intake.lock();
        if !self.gate.deactivate() {
            return false;
        }
        drop(intake);

        self.status.close();
        self.dormant.lock().take();
        info!("Autosave session deactivated");
        true
    }
}

impl<V, P> Drop for Inner<V, P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Handle to an autosave session
///
/// Cheap to clone; every clone drives the same session. The session is
/// torn down by [`Autosave::deactivate`] or when the last handle is dropped.
pub struct Autosave<V, P = V> {
    inner: Arc<Inner<V, P>>,
}

impl<V, P> Clone for Autosave<V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, P> fmt::Debug for Autosave<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autosave")
            .field("config", &self.inner.config)
            .field("phase", &self.inner.gate.phase())
            .field("status", &self.inner.status)
            .finish()
    }
}

impl<V> Autosave<V, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Start building a session that loads its initial value from `loader`.
    ///
    /// The projection defaults to identity.
    pub fn builder<L>(loader: L) -> AutosaveBuilder<V, V>
    where
        L: Loader<V>,
    {
        AutosaveBuilder {
            loader: Arc::new(loader),
            projection: projection(|value: V| value),
            config: AutosaveConfig::default(),
        }
    }
}

impl<V, P> Autosave<V, P>
where
    V: Clone + Send + Sync + 'static,
    P: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start the session: spawn the event loop and the initial load.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(&self) -> Result<()> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| AutosaveError::NoRuntime)?;

        let shutdown = self.inner.gate.activate()?;
        let Some(dormant) = self.inner.dormant.lock().take() else {
            return Err(AutosaveError::AlreadyActive);
        };

        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop {
            inputs: dormant.inputs,
            outcomes: outcome_rx,
            shutdown: shutdown.clone(),
            scheduler: dormant.scheduler,
            coordinator: SaveCoordinator::new(dormant.saver, outcome_tx),
            tracker: SaveStatusTracker::new(self.inner.config.completion_order),
            status: Arc::clone(&self.inner.status),
        };

        runtime.spawn(event_loop.run());
        runtime.spawn(run_load(
            dormant.loader,
            Arc::clone(&self.inner.load_state),
            shutdown,
        ));

        info!(
            "Autosave session activated (frequency: {}ms, completion order: {:?})",
            self.inner.config.frequency_ms, self.inner.config.completion_order
        );
        Ok(())
    }

    /// Report a new value.
    ///
    /// A failing projection is fatal: the error is returned and the session
    /// is torn down.
    pub fn on_change(&self, value: V) -> Result<ChangeOutcome> {
        if !self.inner.gate.is_active() {
            trace!("Change ignored: session not active");
            return Ok(ChangeOutcome::Inactive);
        }

        let mut intake = self.inner.intake.lock();
        // Teardown may have landed while waiting for the lock
        if !self.inner.gate.is_active() {
            return Ok(ChangeOutcome::Inactive);
        }
        let projected = match intake.filter.accept(value) {
            Ok(Some(projected)) => projected,
            Ok(None) => return Ok(ChangeOutcome::Suppressed),
            Err(err) => {
                drop(intake);
                error!("Projection failed, tearing down autosave session: {}", err);
                self.inner.teardown();
                return Err(err);
            }
        };

        let id = intake.counter.next();
        // Sent under the intake lock so ids reach the loop in order
        if self
            .inner
            .inputs
            .send(Input::Change {
                value: projected,
                id,
            })
            .is_err()
        {
            return Ok(ChangeOutcome::Inactive);
        }

        Ok(ChangeOutcome::Accepted(id))
    }

    /// Close the current save window now.
    ///
    /// Returns false if the session is not active.
    pub fn manual_save(&self) -> bool {
        if !self.inner.gate.is_active() {
            trace!("Manual save ignored: session not active");
            return false;
        }

        self.inner.inputs.send(Input::ManualSave).is_ok()
    }

    /// Report `value` as a change, then close the window
    pub fn manual_save_with(&self, value: V) -> Result<ChangeOutcome> {
        let outcome = self.on_change(value)?;
        self.manual_save();
        Ok(outcome)
    }
}

impl<V, P> Autosave<V, P> {
    /// Tear the session down. Returns false if it was already torn down.
    pub fn deactivate(&self) -> bool {
        self.inner.teardown()
    }

    /// Whether the session is running
    pub fn is_active(&self) -> bool {
        self.inner.gate.is_active()
    }

    /// Lifecycle phase
    pub fn phase(&self) -> Phase {
        self.inner.gate.phase()
    }

    /// Status hub shared with consumers
    pub fn status(&self) -> Arc<SaveStatus> {
        Arc::clone(&self.inner.status)
    }

    /// Subscribe to one kind of status event
    pub fn subscribe<F>(&self, kind: StatusKind, callback: F) -> Subscription
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.inner.status.subscribe(kind, callback)
    }

    /// Effective configuration
    pub fn config(&self) -> &AutosaveConfig {
        &self.inner.config
    }

    /// Receiver for the initial load outcome
    pub fn load_state(&self) -> watch::Receiver<LoadState<V>> {
        self.inner.load_state.subscribe()
    }

    /// Wait for the initial load to finish.
    ///
    /// Returns `None` if the session is torn down first.
    pub async fn loaded(&self) -> Option<LoadState<V>>
    where
        V: Clone,
    {
        let mut state = self.load_state();
        let mut shutdown = self.inner.gate.shutdown_signal();

        tokio::select! {
            result = state.wait_for(|state| !state.is_loading()) => {
                result.ok().map(|state| state.clone())
            }
            _ = wait_for_shutdown(&mut shutdown) => None,
        }
    }
}

/// Builder for [`Autosave`]
pub struct AutosaveBuilder<V, P> {
    loader: Arc<dyn Loader<V>>,
    projection: Projection<V, P>,
    config: AutosaveConfig,
}

impl<V, P> AutosaveBuilder<V, P>
where
    V: Clone + Send + Sync + 'static,
{
    /// Replace the whole configuration
    pub fn config(mut self, config: AutosaveConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the debounce interval.
    ///
    /// Intervals are kept in whole milliseconds; a positive sub-millisecond
    /// duration rounds up to 1ms.
    pub fn frequency(mut self, frequency: Duration) -> Self {
        self.config.frequency_ms = duration_to_millis(frequency);
        self
    }

    /// Set how out-of-order completions are folded
    pub fn completion_order(mut self, order: CompletionOrder) -> Self {
        self.config.completion_order = order;
        self
    }

    /// Project each change before comparing and saving it.
    ///
    /// Replaces any earlier projection.
    pub fn map<Q, F>(self, f: F) -> AutosaveBuilder<V, Q>
    where
        Q: 'static,
        F: Fn(V) -> Q + Send + Sync + 'static,
    {
        AutosaveBuilder {
            loader: self.loader,
            projection: projection(f),
            config: self.config,
        }
    }

    /// Like [`AutosaveBuilder::map`], for projections that can fail.
    ///
    /// A failure tears the session down.
    pub fn try_map<Q, F>(self, f: F) -> AutosaveBuilder<V, Q>
    where
        F: Fn(V) -> anyhow::Result<Q> + Send + Sync + 'static,
    {
        AutosaveBuilder {
            loader: self.loader,
            projection: fallible_projection(f),
            config: self.config,
        }
    }

    /// Validate the configuration and create an idle session saving through `saver`
    pub fn build<S>(self, saver: S) -> Result<Autosave<V, P>>
    where
        S: Saver<P>,
        P: Clone + PartialEq + Send + Sync + 'static,
    {
        self.config.validate()?;
        let scheduler = SaveWindowScheduler::new(self.config.frequency())?;

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (load_state, _) = watch::channel(LoadState::Loading);

        let inner = Inner {
            config: self.config,
            gate: LifecycleGate::new(),
            intake: Mutex::new(Intake {
                filter: ChangeFilter::new(self.projection),
                counter: ChangeCounter::new(),
            }),
            inputs: inputs_tx,
            dormant: Mutex::new(Some(Dormant {
                inputs: inputs_rx,
                loader: self.loader,
                saver: Arc::new(saver),
                scheduler,
            })),
            status: SaveStatus::new(),
            load_state: Arc::new(load_state),
        };

        Ok(Autosave {
            inner: Arc::new(inner),
        })
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if millis == 0 && !duration.is_zero() {
        1
    } else {
        millis
    }
}

async fn run_load<V: Send + Sync + 'static>(
    loader: Arc<dyn Loader<V>>,
    load_state: Arc<watch::Sender<LoadState<V>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let result = tokio::select! {
        result = loader.load() => result,
        _ = wait_for_shutdown(&mut shutdown) => {
            debug!("Initial load abandoned: session torn down");
            return;
        }
    };

    // Teardown may have raced the load
    if *shutdown.borrow() {
        return;
    }

    match result {
        Ok(value) => {
            info!("Initial value loaded");
            load_state.send_replace(LoadState::Ready(value));
        }
        Err(err) => {
            warn!("Initial load failed: {:#}", err);
            load_state.send_replace(LoadState::Failed(Arc::new(err)));
        }
    }
}

/// Single task owning the scheduler, coordinator and tracker
struct EventLoop<P> {
    inputs: mpsc::UnboundedReceiver<Input<P>>,
    outcomes: mpsc::UnboundedReceiver<SaveOutcome>,
    shutdown: watch::Receiver<bool>,
    scheduler: SaveWindowScheduler,
    coordinator: SaveCoordinator<P>,
    tracker: SaveStatusTracker,
    status: Arc<SaveStatus>,
}

impl<P> EventLoop<P>
where
    P: Clone + Send + 'static,
{
    async fn run(mut self) {
        debug!("Autosave event loop started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let debounce = self.scheduler.deadline();
            let tick = self.tracker.next_tick();

            // Inputs are polled before timers: a manual save arriving at the
            // debounce instant pre-empts the debounce window.
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => break,

                input = self.inputs.recv() => match input {
                    Some(Input::Change { value, id }) => self.on_change(value, id),
                    Some(Input::ManualSave) => self.on_manual_save(),
                    None => break,
                },

                Some(outcome) = self.outcomes.recv() => self.on_outcome(outcome),

                _ = sleep_until_some(debounce) => self.on_debounce(),

                _ = sleep_until_some(tick) => self.on_tick(),
            }
        }

        debug!(
            "Autosave event loop stopped ({} saves still in flight)",
            self.coordinator.in_flight()
        );
    }

    fn on_change(&mut self, value: P, id: SequenceId) {
        trace!("Accepted change {}", id);
        self.coordinator.record(value, id);
        self.scheduler.on_change(Instant::now());

        if let Some(saved) = self.tracker.on_change(id) {
            self.status.publish(StatusEvent::Saved(saved));
        }
    }

    fn on_manual_save(&mut self) {
        let latest = self.coordinator.latest_id();
        if let Some(end) = self.scheduler.manual(Instant::now(), latest) {
            self.close_window(end);
        }
    }

    fn on_debounce(&mut self) {
        let latest = self.coordinator.latest_id();
        if let Some(end) = self.scheduler.poll_deadline(Instant::now(), latest) {
            self.close_window(end);
        }
    }

    fn close_window(&mut self, end: WindowEnd) {
        if let Some(request) = self.coordinator.close_window(end) {
            debug!("Save window closed ({:?}); saving change {}", request.trigger, request.id);
        }
    }

    fn on_outcome(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Completed(id) => {
                debug!("Save of change {} completed", id);
                let completed = self.tracker.on_completion(id, Instant::now());

                if let Some(saved) = completed.saved {
                    self.status.publish(StatusEvent::Saved(saved));
                }
                self.status
                    .publish(StatusEvent::SinceSave(completed.since_save));
            }
            SaveOutcome::Failed { id, error } => {
                warn!("Save of change {} failed: {:#}", id, error);
                self.status.publish(StatusEvent::SaveFailed {
                    id,
                    message: format!("{:#}", error),
                });
            }
        }
    }

    fn on_tick(&mut self) {
        if let Some(secs) = self.tracker.tick(Instant::now()) {
            self.status.publish(StatusEvent::SinceSave(secs));
        }
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
