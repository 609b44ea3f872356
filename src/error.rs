//! Error types for the memoization cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache-layer operations.
///
/// Failures of the wrapped function itself are never represented here; they
/// propagate unchanged through the memoization wrapper and are not cached.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store unreachable or refusing commands
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Arguments or output could not be serialized
    #[error("Encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

// == Decode Error ==
/// A stored record that could not be decoded.
///
/// Recovered where it is found: the lookup scan purges the record and keeps
/// going. There is deliberately no conversion into [`CacheError`], so a
/// malformed record can only ever surface to callers as a miss.
#[derive(Error, Debug)]
#[error("Malformed record: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

// == Result Type Alias ==
/// Convenience Result type for cache-layer operations.
pub type Result<T> = std::result::Result<T, CacheError>;
