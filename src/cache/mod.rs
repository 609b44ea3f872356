//! Cache Module
//!
//! Entry codec, call identity, and the bounded expiring list engine.

mod entry;
mod signature;
mod stats;
mod store;


// Re-export public types
pub use entry::{decode_entry, encode_entry, now_epoch_secs, CacheEntry};
pub use signature::{encode_signature, ArgSignature, ArgSpec, CacheKey, SignatureEncoder};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{Lookup, MemoCache};

// == Public Constants ==
/// Default number of entries kept per cached function
pub const DEFAULT_MAX_SIZE: usize = 10_000;
