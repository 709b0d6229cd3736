//! Error types for oncecall.

use std::path::PathBuf;

use thiserror::Error;

/// Default result type for oncecall.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by the cache itself.
///
/// Errors produced by wrapped functions are not represented here; they are
/// captured as [`CapturedError`](crate::cache::CapturedError) and replayed
/// through the function's own error type.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Argument '{argument}' cannot be used in a cache key: {reason}")]
    KeyConstruction { argument: String, reason: String },

    #[error("Cache store could not be deserialized: {0}")]
    Deserialization(String),

    #[error("Cache store not found at: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cached value for '{function}' does not match the expected type: {reason}")]
    ValueMismatch { function: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl CacheError {
    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a key construction error for the named argument.
    pub fn key<A: Into<String>, R: ToString>(argument: A, reason: R) -> Self {
        Self::KeyConstruction {
            argument: argument.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a deserialization error.
    pub fn deserialization<R: ToString>(reason: R) -> Self {
        Self::Deserialization(reason.to_string())
    }

    /// Whether this error means the persisted store does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
