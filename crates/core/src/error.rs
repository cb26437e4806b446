//! Autosave error types.

use thiserror::Error;

/// Error raised by the save-scheduling core and the session around it.
#[derive(Debug, Error)]
pub enum AutosaveError {
    /// Debounce interval of zero.
    #[error("Save frequency must be greater than zero")]
    InvalidFrequency,

    /// `activate` called on a session that is already running.
    #[error("Session is already active")]
    AlreadyActive,

    /// `activate` called on a session that has been torn down.
    #[error("Session has been deactivated and cannot be restarted")]
    Deactivated,

    /// `activate` called outside of a tokio runtime.
    #[error("No tokio runtime available to drive the session")]
    NoRuntime,

    /// The projection function failed; the session is torn down.
    #[error("Projection failed: {0}")]
    Projection(#[source] anyhow::Error),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration")]
    ConfigParse(#[from] toml::de::Error),
}

impl AutosaveError {
    /// Whether this error ended the session it was raised from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Projection(_))
    }
}

/// Result type alias for autosave operations.
pub type Result<T> = std::result::Result<T, AutosaveError>;
