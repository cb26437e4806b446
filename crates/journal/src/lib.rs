//! Snapshot journal
//!
//! This crate provides:
//! - Snapshot records (ULID-based IDs)
//! - Append-only journal (sled embedded DB)

pub mod journal;
pub mod snapshot;

// Re-exports
pub use journal::Journal;
pub use snapshot::Snapshot;

/// Result type for journal operations
pub type Result<T> = anyhow::Result<T>;
