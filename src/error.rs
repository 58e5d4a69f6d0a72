//! Error types for cache-algorithm operations.

use std::fmt;

/// Errors that can occur at the cache-algorithm boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The fingerprint is already resident (for admissions).
    AlreadyInCache,

    /// No cache algorithm is registered under this name.
    UnknownAlgorithm(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInCache => write!(f, "object part is already in the cache"),
            Self::UnknownAlgorithm(name) => write!(f, "no such cache algorithm: `{}`", name),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache-algorithm operations.
pub type CacheResult<T> = Result<T, CacheError>;
