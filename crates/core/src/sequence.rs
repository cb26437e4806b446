//! Change sequence numbers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one accepted change.
///
/// Id 0 is the baseline before any change is accepted; the first accepted
/// change gets id 1.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceId(u64);

impl SequenceId {
    /// Baseline id, never assigned to a change
    pub const ZERO: Self = Self(0);

    /// Wrap a raw counter value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw counter value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Assigns a sequence id to every accepted change
#[derive(Debug, Default)]
pub struct ChangeCounter {
    current: SequenceId,
}

impl ChangeCounter {
    /// Create a counter at the baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one and return the new id
    pub fn next(&mut self) -> SequenceId {
        self.current = SequenceId(self.current.0 + 1);
        self.current
    }

    /// Most recently assigned id (baseline if none)
    pub fn current(&self) -> SequenceId {
        self.current
    }
}
