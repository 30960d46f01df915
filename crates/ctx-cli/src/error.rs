//! CLI error types.

use ctx_context::ContextError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Assembly or validation failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Shortcut for an invalid-configuration error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Context(ContextError::invalid_configuration(reason))
    }
}
