//! Error types for rememo
//!
//! All modules use `RememoResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rememo operations
pub type RememoResult<T> = Result<T, RememoError>;

/// All errors that can occur in rememo
#[derive(Error, Debug)]
pub enum RememoError {
    // Access policy errors
    #[error("Invalid access spec \"{spec}\": unexpected character '{offending}' (allowed: r, e, w)")]
    InvalidAccess { spec: String, offending: char },

    // Key derivation errors
    #[error("Cannot derive a cache key from {context}")]
    UnhashableArgument {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // Orchestration errors
    #[error("No cached value in \"{path}\" and execution is not permitted (access=\"{access}\")")]
    ExecutionNotPermitted { path: PathBuf, access: String },

    // Persistence errors
    #[error("Value cannot be serialized for caching")]
    UnserializableValue {
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache file \"{path}\" is corrupt and cannot be deserialized")]
    CacheCorruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache file \"{path}\" holds a {found} value, not a key-value mapping; rename or delete it first")]
    WrongBlobShape { path: PathBuf, found: &'static str },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RememoError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a key derivation error with context
    pub fn unhashable(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::UnhashableArgument {
            context: context.into(),
            source,
        }
    }
}
