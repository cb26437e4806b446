//! Save status publish/subscribe hub
//!
//! Consumers subscribe to one kind of status event and get a handle back
//! that removes the callback again. The hub also keeps the last published
//! values so they can be polled.

use crate::sequence::SequenceId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Status notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Whether the latest change has been saved
    Saved(bool),
    /// Seconds since the last successful save
    SinceSave(u64),
    /// A save failed and will not be retried
    SaveFailed {
        /// Change id the failed save carried
        id: SequenceId,
        /// Rendered error
        message: String,
    },
}

impl StatusEvent {
    /// Kind used for subscription matching
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Saved(_) => StatusKind::Saved,
            Self::SinceSave(_) => StatusKind::SinceSave,
            Self::SaveFailed { .. } => StatusKind::SaveFailed,
        }
    }
}

/// Subscription selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Saved,
    SinceSave,
    SaveFailed,
}

type Callback = Arc<dyn Fn(&StatusEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    kind: StatusKind,
    callback: Callback,
}

#[derive(Debug, Default, Clone, Copy)]
struct Latest {
    saved: bool,
    since_save: Option<u64>,
}

/// Broadcasts status events to subscribers
pub struct SaveStatus {
    subscribers: Mutex<Vec<Subscriber>>,
    latest: Mutex<Latest>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl SaveStatus {
    /// Create an open hub with no subscribers
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
            latest: Mutex::new(Latest::default()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Register a callback for one kind of event
    pub fn subscribe<F>(self: &Arc<Self>, kind: StatusKind, callback: F) -> Subscription
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        if !self.is_closed() {
            self.subscribers.lock().push(Subscriber {
                id,
                kind,
                callback: Arc::new(callback),
            });
        }

        Subscription {
            id,
            status: Arc::downgrade(self),
        }
    }

    /// Register a callback for `saved` changes
    pub fn subscribe_saved<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.subscribe(StatusKind::Saved, move |event| {
            if let StatusEvent::Saved(saved) = event {
                callback(*saved);
            }
        })
    }

    /// Register a callback for since-save ticks
    pub fn subscribe_since_save<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.subscribe(StatusKind::SinceSave, move |event| {
            if let StatusEvent::SinceSave(secs) = event {
                callback(*secs);
            }
        })
    }

    /// Deliver an event to every subscriber of its kind
    pub fn publish(&self, event: StatusEvent) {
        if self.is_closed() {
            return;
        }

        {
            let mut latest = self.latest.lock();
            match event {
                StatusEvent::Saved(saved) => latest.saved = saved,
                StatusEvent::SinceSave(secs) => latest.since_save = Some(secs),
                StatusEvent::SaveFailed { .. } => {}
            }
        }

        // Callbacks run outside the lock so they may subscribe/unsubscribe
        let kind = event.kind();
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Arc::clone(&s.callback))
            .collect();

        for callback in callbacks {
            if self.is_closed() {
                return;
            }
            callback(&event);
        }
    }

    /// Stop all delivery and drop every subscriber
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.lock().clear();
    }

    /// Whether the hub has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Last published `saved` value (false until the first save lands)
    pub fn is_saved(&self) -> bool {
        self.latest.lock().saved
    }

    /// Last published since-save count
    pub fn since_save(&self) -> Option<u64> {
        self.latest.lock().since_save
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|s| s.id != id);
    }
}

impl fmt::Debug for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveStatus")
            .field("subscribers", &self.subscriber_count())
            .field("latest", &*self.latest.lock())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Handle returned by [`SaveStatus::subscribe`]
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    status: Weak<SaveStatus>,
}

impl Subscription {
    /// Remove the callback from the hub
    pub fn unsubscribe(self) {
        if let Some(status) = self.status.upgrade() {
            status.remove(self.id);
        }
    }
}
