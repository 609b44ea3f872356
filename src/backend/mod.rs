//! Backing Store Module
//!
//! The ordered-list primitives the cache layer consumes, plus an
//! in-process implementation for tests and single-process use.

mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

// == List Store Contract ==
/// Ordered-list primitives of a backing store, one list per cache key.
///
/// Elements are opaque byte records; the cache layer owns their encoding.
/// Each call must be atomic on its own, but sequences of calls are not
/// transactional. Remote implementations report connectivity failures as
/// [`CacheError::StoreUnavailable`](crate::error::CacheError::StoreUnavailable).
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Appends a value at the tail of the key's list.
    async fn append_right(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes and returns the head element, or None if the list is empty.
    async fn pop_left(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Returns the number of elements under the key.
    async fn length(&self, key: &str) -> Result<usize>;

    /// Removes every element byte-equal to `value`, returning how many went.
    async fn remove_matching(&self, key: &str, value: &[u8]) -> Result<usize>;

    /// Returns all elements under the key, head to tail.
    async fn range_all(&self, key: &str) -> Result<Vec<Vec<u8>>>;

    /// Applies or replaces a whole-key expiration, in seconds from now.
    async fn set_ttl(&self, key: &str, seconds: u64) -> Result<()>;

    /// Removes the key and its list.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every key in the store.
    async fn flush_all(&self) -> Result<()>;
}

// == Shared Store ==
/// A shared handle to a store is itself a store.
#[async_trait]
impl<S: ListStore + ?Sized> ListStore for Arc<S> {
    async fn append_right(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).append_right(key, value).await
    }

    async fn pop_left(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).pop_left(key).await
    }

    async fn length(&self, key: &str) -> Result<usize> {
        (**self).length(key).await
    }

    async fn remove_matching(&self, key: &str, value: &[u8]) -> Result<usize> {
        (**self).remove_matching(key, value).await
    }

    async fn range_all(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        (**self).range_all(key).await
    }

    async fn set_ttl(&self, key: &str, seconds: u64) -> Result<()> {
        (**self).set_ttl(key, seconds).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn flush_all(&self) -> Result<()> {
        (**self).flush_all().await
    }
}
