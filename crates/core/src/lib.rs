//! Save-scheduling core for Autosave
//!
//! This crate provides the synchronous building blocks:
//! - Change projection and duplicate suppression
//! - Sequence ids for accepted changes
//! - Debounce / manual-save window scheduling
//! - Saved / time-since-save tracking
//! - Status publish/subscribe hub
//!
//! Time-dependent pieces take `tokio::time::Instant` so they run on
//! tokio's clock (and its paused clock in tests).

pub mod config;
pub mod error;
pub mod filter;
pub mod sequence;
pub mod status;
pub mod tracker;
pub mod window;

// Re-exports
pub use config::AutosaveConfig;
pub use error::{AutosaveError, Result};
pub use filter::{fallible_projection, projection, ChangeFilter, Projection};
pub use sequence::{ChangeCounter, SequenceId};
pub use status::{SaveStatus, StatusEvent, StatusKind, Subscription};
pub use tracker::{CompletionOrder, Completed, SaveStatusTracker, SINCE_SAVE_TICK};
pub use window::{SaveWindowScheduler, WindowEnd, WindowTrigger};

/// Value captured when a save window closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest<P> {
    /// Latest projected value at close time
    pub value: P,
    /// Id of that value
    pub id: SequenceId,
    /// What closed the window
    pub trigger: WindowTrigger,
}
