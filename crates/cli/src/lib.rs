//! Library side of the `autosave` binary
//!
//! Kept separate from `main.rs` so settings, projection and the journal
//! adapter can be unit-tested without spawning the binary.

pub mod project;
pub mod settings;
pub mod store;
pub mod util;
