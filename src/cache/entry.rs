//! Cache Entry Module
//!
//! Defines the wire record for one cached call and its codec.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::ArgSignature;
use crate::error::{CacheError, DecodeError, Result};

// == Cache Entry ==
/// One cached call: argument signature, the function's output, and expiry
/// metadata, stored as a single flat record.
///
/// `created_at` is set once at construction and never rewritten; a touch on
/// hit re-inserts the byte-identical record rather than editing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical signature of the call that produced this entry
    pub signature: ArgSignature,
    /// The wrapped function's output as a JSON value
    pub output: serde_json::Value,
    /// Creation timestamp (seconds since the Unix epoch)
    pub created_at: f64,
    /// Per-entry TTL in seconds, None = no per-entry expiration
    pub expire_seconds: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current wall-clock time.
    ///
    /// # Arguments
    /// * `signature` - Canonical signature of the producing call
    /// * `output` - The function's output, already rendered to JSON
    /// * `expire_seconds` - Optional per-entry TTL
    pub fn new(
        signature: ArgSignature,
        output: serde_json::Value,
        expire_seconds: Option<u64>,
    ) -> Self {
        Self {
            signature,
            output,
            created_at: now_epoch_secs(),
            expire_seconds,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now` (epoch seconds).
    ///
    /// Boundary condition: an entry is expired once the full TTL has elapsed,
    /// when `now >= created_at + expire_seconds`. Entries without a per-entry
    /// TTL never expire on their own.
    pub fn is_expired(&self, now: f64) -> bool {
        match self.expire_seconds {
            Some(expire) => now >= self.created_at + expire as f64,
            None => false,
        }
    }
}

// == Entry Codec ==
/// Serializes an entry into its wire record.
pub fn encode_entry(entry: &CacheEntry) -> Result<Vec<u8>> {
    serde_json::to_vec(entry).map_err(CacheError::Encode)
}

/// Decodes a wire record.
///
/// Total over arbitrary input: malformed bytes yield [`DecodeError`], never
/// a panic. Callers treat a failed record as unusable and purge it instead
/// of propagating the failure.
pub fn decode_entry(bytes: &[u8]) -> std::result::Result<CacheEntry, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

// == Utility Functions ==
/// Returns the current wall-clock time in seconds since the Unix epoch.
pub fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs_f64()
}
