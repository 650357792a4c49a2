//! Error definitions for the mapping module

use thiserror::Error;

/// Configuration errors for combo groups; fatal at startup
#[derive(Debug, Error)]
pub enum MappingError {
    /// A group that could never fire or that cannot be told apart from another
    #[error("Invalid button group `{name}`: {reason}")]
    InvalidGroup { name: String, reason: String },

    /// A button or axis number outside the representable range
    #[error("Invalid index {index} for `{name}`")]
    InvalidIndex { name: String, index: i64 },

    /// A scalar setting outside its allowed range
    #[error("Invalid setting `{name}`: {reason}")]
    InvalidSetting { name: String, reason: String },
}

/// Failure reported by an action callback; logged, never fatal
#[derive(Debug, Error)]
#[error("Action `{action}` failed: {reason}")]
pub struct ActionError {
    pub action: String,
    pub reason: String,
}

impl ActionError {
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}
