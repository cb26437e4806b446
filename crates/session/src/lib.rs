//! Autosave sessions on tokio
//!
//! This crate wires the save-scheduling core into a running session:
//! - Load / save collaborator traits
//! - Save coordination with concurrent in-flight saves
//! - Activation / teardown gate
//! - Single-task event loop driving debounce and since-save timers

pub mod collab;
pub mod coordinator;
pub mod lifecycle;
pub mod session;

// Re-exports
pub use autosave_core::{
    AutosaveConfig, AutosaveError, CompletionOrder, Result, SaveStatus, SequenceId, StatusEvent,
    StatusKind, Subscription, WindowTrigger,
};
pub use collab::{load_fn, save_fn, LoadFn, LoadState, Loader, SaveFn, Saver};
pub use coordinator::{SaveCoordinator, SaveOutcome};
pub use lifecycle::{LifecycleGate, Phase};
pub use session::{Autosave, AutosaveBuilder, ChangeOutcome};
