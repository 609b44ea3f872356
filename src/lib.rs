//! memolist - Function memoization over a bounded, expiring list store
//!
//! Wraps expensive async calls behind a cache keyed by function identity
//! and argument signature, with per-entry expiration, oldest-first
//! eviction, and single-flight misses. The backing store is consumed
//! through the [`ListStore`] trait; [`MemoryStore`] serves tests and
//! single-process use.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod memo;

pub use backend::{ListStore, MemoryStore};
pub use cache::{Lookup, MemoCache};
pub use config::Config;
pub use error::{CacheError, DecodeError};
pub use memo::Memoized;
