//! Error types for Ratchet

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using RatchetError
pub type Result<T> = std::result::Result<T, RatchetError>;

/// Main error type for Ratchet configuration handling
#[derive(Debug, Error)]
pub enum RatchetError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file in the directory or any parent
    #[error("Configuration file not found in {0} or any parent directory")]
    NotFound(PathBuf),

    /// A configured value breaks an invariant
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The file could not be read
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::InvalidValue`]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
