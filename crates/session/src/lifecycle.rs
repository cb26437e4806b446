//! Session lifecycle gate
//!
//! One activation, one teardown. Teardown is broadcast over a `watch`
//! channel so every task of the session can stop on it.

use autosave_core::{AutosaveError, Result};
use parking_lot::Mutex;
use tokio::sync::watch;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, not yet activated
    Idle,
    /// Running
    Active,
    /// Torn down; terminal
    Deactivated,
}

/// Guards activation and teardown of a session
#[derive(Debug)]
pub struct LifecycleGate {
    phase: Mutex<Phase>,
    shutdown: watch::Sender<bool>,
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGate {
    /// Create an idle gate
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            phase: Mutex::new(Phase::Idle),
            shutdown,
        }
    }

    /// Move to `Active` and hand out a shutdown receiver
    pub fn activate(&self) -> Result<watch::Receiver<bool>> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Idle => {
                *phase = Phase::Active;
                Ok(self.shutdown.subscribe())
            }
            Phase::Active => Err(AutosaveError::AlreadyActive),
            Phase::Deactivated => Err(AutosaveError::Deactivated),
        }
    }

    /// Move to `Deactivated` and signal shutdown.
    ///
    /// Returns false if the gate was already deactivated.
    pub fn deactivate(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase == Phase::Deactivated {
            return false;
        }

        *phase = Phase::Deactivated;
        self.shutdown.send_replace(true);
        true
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Whether the session is running
    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    /// Receiver that flips to `true` on teardown
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Resolve once `shutdown` reads `true` (or its gate is gone)
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|down| *down).await;
}
