//! In-Memory List Store
//!
//! HashMap-of-lists implementation of the store contract with lazy
//! whole-key TTL expiry, for tests and single-process caching.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::ListStore;
use crate::error::Result;

// == Stored List ==
/// One key's elements plus its optional whole-key expiration.
#[derive(Debug, Default)]
struct StoredList {
    items: VecDeque<Vec<u8>>,
    expires_at: Option<Instant>,
}

impl StoredList {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

// == Memory Store ==
/// In-process implementation of [`ListStore`].
///
/// Keys expire lazily: an expired key is dropped by the first operation
/// that touches it, the way a remote store would report it gone. A key
/// whose list empties is dropped along with its TTL. Operations never fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: RwLock<HashMap<String, StoredList>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the key if its whole-key TTL has elapsed.
    fn purge_if_expired(lists: &mut HashMap<String, StoredList>, key: &str) {
        let now = Instant::now();
        if lists.get(key).is_some_and(|list| list.is_expired(now)) {
            lists.remove(key);
        }
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn append_right(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut lists = self.lists.write().await;
        Self::purge_if_expired(&mut lists, key);
        lists
            .entry(key.to_string())
            .or_default()
            .items
            .push_back(value.to_vec());
        Ok(())
    }

    async fn pop_left(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut lists = self.lists.write().await;
        Self::purge_if_expired(&mut lists, key);
        let Some(list) = lists.get_mut(key) else {
            return Ok(None);
        };
        let head = list.items.pop_front();
        if list.items.is_empty() {
            lists.remove(key);
        }
        Ok(head)
    }

    async fn length(&self, key: &str) -> Result<usize> {
        let mut lists = self.lists.write().await;
        Self::purge_if_expired(&mut lists, key);
        Ok(lists.get(key).map_or(0, |list| list.items.len()))
    }

    async fn remove_matching(&self, key: &str, value: &[u8]) -> Result<usize> {
        let mut lists = self.lists.write().await;
        Self::purge_if_expired(&mut lists, key);
        let Some(list) = lists.get_mut(key) else {
            return Ok(0);
        };
        let before = list.items.len();
        list.items.retain(|item| item.as_slice() != value);
        let removed = before - list.items.len();
        if list.items.is_empty() {
            lists.remove(key);
        }
        Ok(removed)
    }

    async fn range_all(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        let mut lists = self.lists.write().await;
        Self::purge_if_expired(&mut lists, key);
        Ok(lists
            .get(key)
            .map(|list| list.items.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_ttl(&self, key: &str, seconds: u64) -> Result<()> {
        let mut lists = self.lists.write().await;
        Self::purge_if_expired(&mut lists, key);
        // a missing key keeps no TTL, matching EXPIRE on a missing key
        if let Some(list) = lists.get_mut(key) {
            // a deadline past what Instant can represent never fires,
            // so an unrepresentable TTL leaves the key without one
            list.expires_at = Instant::now().checked_add(Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lists.write().await.remove(key);
        Ok(())
    }

    async fn flush_all(&self) -> Result<()> {
        self.lists.write().await.clear();
        Ok(())
    }
}
