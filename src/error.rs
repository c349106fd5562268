//! Error types for permission-streams.
//!
//! Request outcomes are never errors: a denial is `false` and a foreign
//! request token is a "not handled" `false`. Only construction-time problems
//! surface here.

use thiserror::Error;

/// Errors raised while building or configuring the permission core.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// A request named no capabilities.
    #[error("permission request must name at least one capability")]
    EmptyRequest,

    /// The configuration is invalid.
    #[error("invalid permissions configuration: {message}")]
    Config { message: String },

    /// Reading a configuration file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PermissionError>;
