//! Core error types for rateme-core.
//!
//! The durable store has exactly one failure mode ([`StoreError::Unavailable`]);
//! everything above it wraps that together with configuration and IO errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for rateme-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key-value store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be read or written.
    #[error("store '{namespace}' is unavailable: {message}")]
    Unavailable { namespace: String, message: String },
}

impl StoreError {
    pub fn unavailable(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            namespace: namespace.into(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key not present in the configuration schema
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_message_names_namespace() {
        let err = StoreError::unavailable("RateThisApp", "disk detached");
        assert_eq!(
            err.to_string(),
            "store 'RateThisApp' is unavailable: disk detached"
        );
    }

    #[test]
    fn store_error_converts_into_core_error() {
        let err: CoreError = StoreError::unavailable("ns", "gone").into();
        assert!(matches!(err, CoreError::Store(StoreError::Unavailable { .. })));
    }
}
