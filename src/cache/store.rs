//! Cache Store Module
//!
//! Bounded, expiring list semantics over one backing-store key per cached
//! function: lookup with lazy purge, FIFO eviction, and touch.

use tracing::debug;

use crate::backend::ListStore;
use crate::cache::{
    decode_entry, encode_entry, now_epoch_secs, ArgSignature, CacheEntry, CacheKey, CacheStats,
    StatsSnapshot,
};
use crate::config::Config;
use crate::error::Result;

// == Lookup Outcome ==
/// Result of scanning a key's list for one signature.
///
/// "Not cached" is an explicit variant, never a sentinel value compared by
/// identity, so any output value can be cached, including nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A live entry carrying the requested signature
    Hit(CacheEntry),
    /// No live entry carries the requested signature
    Miss,
}

impl Lookup {
    /// Returns true for [`Lookup::Hit`].
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// Returns true for [`Lookup::Miss`].
    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }
}

// == Memo Cache ==
/// Cache engine over a backing list store.
///
/// Each cached function owns one backing-store key whose list holds its
/// entries in insertion order, oldest at the head, bounded to `max_size`
/// elements.
#[derive(Debug)]
pub struct MemoCache<S> {
    /// Backing list store
    store: S,
    /// Maximum number of entries per key
    max_size: usize,
    /// Optional whole-key TTL in seconds, refreshed on every insert
    global_expire: Option<u64>,
    /// Performance statistics
    stats: CacheStats,
}

impl<S: ListStore> MemoCache<S> {
    // == Constructor ==
    /// Creates a new MemoCache over `store`.
    ///
    /// # Arguments
    /// * `store` - The backing list store
    /// * `max_size` - Maximum number of entries kept per key
    /// * `global_expire` - Optional whole-key TTL in seconds
    pub fn new(store: S, max_size: usize, global_expire: Option<u64>) -> Self {
        Self {
            store,
            max_size,
            global_expire,
            stats: CacheStats::new(),
        }
    }

    /// Creates a cache configured from [`Config`].
    ///
    /// Connection parameters in the config are the store's concern, not
    /// this cache's; pass a store already built from them.
    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(store, config.max_size, config.global_expire)
    }

    // == Lookup ==
    /// Scans `key`'s list for `signature`, purging dead records on the way.
    ///
    /// Walks head to tail. Records that fail to decode and records whose
    /// per-entry TTL has elapsed are removed from the backing list as they
    /// are found; the first live record with a matching signature is the
    /// hit. The hit is not promoted here, that is [`Self::touch`]. Worst
    /// case O(list length) in store traffic, bounded by `max_size`.
    pub async fn lookup(&self, key: &CacheKey, signature: &ArgSignature) -> Result<Lookup> {
        let records = self.guard(self.store.range_all(key.as_str()).await)?;
        let now = now_epoch_secs();

        for raw in records {
            let entry = match decode_entry(&raw) {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(key = %key, error = %err, "purging malformed record");
                    self.stats.record_purged_malformed();
                    self.guard(self.store.remove_matching(key.as_str(), &raw).await)?;
                    continue;
                }
            };

            if entry.is_expired(now) {
                debug!(key = %key, signature = %entry.signature, "purging expired record");
                self.stats.record_purged_expired();
                self.guard(self.store.remove_matching(key.as_str(), &raw).await)?;
                continue;
            }

            if entry.signature == *signature {
                self.stats.record_hit();
                return Ok(Lookup::Hit(entry));
            }
        }

        self.stats.record_miss();
        Ok(Lookup::Miss)
    }

    // == Insert ==
    /// Appends `entry` to `key`'s list, evicting the oldest element first
    /// when the list is at capacity.
    ///
    /// The length check and the append are separate store commands, so two
    /// racing inserters can each see room and leave the list over
    /// `max_size` by at most the number of concurrent racers. Sequential
    /// inserts never exceed the bound when `max_size` is at least 1; a
    /// zero capacity degenerates to keeping exactly the newest entry,
    /// since popping the empty list is a no-op before the append. An
    /// overshoot is tolerated, not repaired. Inserting also refreshes the
    /// whole-key TTL when one is configured.
    pub async fn insert(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let encoded = encode_entry(entry)?;

        let len = self.guard(self.store.length(key.as_str()).await)?;
        if len >= self.max_size {
            if self
                .guard(self.store.pop_left(key.as_str()).await)?
                .is_some()
            {
                self.stats.record_eviction();
                debug!(key = %key, "evicted oldest entry");
            }
        }

        self.guard(self.store.append_right(key.as_str(), &encoded).await)?;

        if let Some(seconds) = self.global_expire {
            self.guard(self.store.set_ttl(key.as_str(), seconds).await)?;
        }

        Ok(())
    }

    // == Touch ==
    /// Re-appends the byte-identical record, approximating recency
    /// promotion.
    ///
    /// Eviction stays strictly positional: a touch delays eviction only
    /// until the record ages back to the head, and concurrent touches give
    /// no least-recently-used guarantee. Two racing touches of one record
    /// can interleave remove/remove/append/append and leave two
    /// byte-identical copies; the next touch removes every copy and
    /// re-appends one, so the duplication never outlives the following
    /// promotion. The whole-key TTL is not refreshed here; only inserts
    /// refresh it. Touching a key's sole record briefly empties the list,
    /// which drops the key and any whole-key TTL with it; the TTL returns
    /// on the next insert.
    pub async fn touch(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let encoded = encode_entry(entry)?;
        self.guard(self.store.remove_matching(key.as_str(), &encoded).await)?;
        self.guard(self.store.append_right(key.as_str(), &encoded).await)?;
        Ok(())
    }

    // == Remove Entry ==
    /// Purges one record without re-appending it.
    ///
    /// Used when a stored record turns out unusable after a hit, so the
    /// next call recomputes instead of tripping over it again.
    pub(crate) async fn remove_entry(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let encoded = encode_entry(entry)?;
        self.guard(self.store.remove_matching(key.as_str(), &encoded).await)?;
        Ok(())
    }

    // == Delete ==
    /// Removes `key` and every entry under it.
    pub async fn delete(&self, key: &CacheKey) -> Result<()> {
        self.guard(self.store.delete(key.as_str()).await)
    }

    // == Clear ==
    /// Removes every key in the backing store.
    pub async fn clear(&self) -> Result<()> {
        self.guard(self.store.flush_all().await)
    }

    // == Stats ==
    /// Returns a point-in-time copy of the cache counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Counts a failed store command before handing the error back.
    fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.stats.record_store_error();
        }
        result
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use crate::cache::ArgSpec;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn entry_for(n: u64, output: serde_json::Value) -> CacheEntry {
        CacheEntry::new((n,).signature().unwrap(), output, None)
    }

    fn shared_cache(
        max_size: usize,
        global_expire: Option<u64>,
    ) -> (Arc<MemoryStore>, MemoCache<Arc<MemoryStore>>) {
        let store = Arc::new(MemoryStore::new());
        let cache = MemoCache::new(Arc::clone(&store), max_size, global_expire);
        (store, cache)
    }

    /// Store that parks every append at a barrier until `parties` callers
    /// have arrived, so paired remove/append sequences interleave as
    /// remove, remove, append, append.
    #[derive(Debug)]
    struct GatedAppendStore {
        inner: Arc<MemoryStore>,
        gate: Barrier,
    }

    impl GatedAppendStore {
        fn new(inner: Arc<MemoryStore>, parties: usize) -> Self {
            Self {
                inner,
                gate: Barrier::new(parties),
            }
        }
    }

    #[async_trait]
    impl ListStore for GatedAppendStore {
        async fn append_right(&self, key: &str, value: &[u8]) -> Result<()> {
            self.gate.wait().await;
            self.inner.append_right(key, value).await
        }

        async fn pop_left(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.pop_left(key).await
        }

        async fn length(&self, key: &str) -> Result<usize> {
            self.inner.length(key).await
        }

        async fn remove_matching(&self, key: &str, value: &[u8]) -> Result<usize> {
            self.inner.remove_matching(key, value).await
        }

        async fn range_all(&self, key: &str) -> Result<Vec<Vec<u8>>> {
            self.inner.range_all(key).await
        }

        async fn set_ttl(&self, key: &str, seconds: u64) -> Result<()> {
            self.inner.set_ttl(key, seconds).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }

        async fn flush_all(&self) -> Result<()> {
            self.inner.flush_all().await
        }
    }

    #[tokio::test]
    async fn test_lookup_hit_after_insert() {
        let (_, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::square");
        let entry = entry_for(7, json!(49));

        cache.insert(&key, &entry).await.unwrap();
        let outcome = cache.lookup(&key, &entry.signature).await.unwrap();

        assert_eq!(outcome, Lookup::Hit(entry));
    }

    #[tokio::test]
    async fn test_lookup_miss_on_empty_key() {
        let (_, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::never_called");
        let signature = (1u64,).signature().unwrap();

        let outcome = cache.lookup(&key, &signature).await.unwrap();
        assert!(outcome.is_miss());
    }

    #[tokio::test]
    async fn test_lookup_miss_on_unknown_signature() {
        let (_, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::square");

        cache.insert(&key, &entry_for(7, json!(49))).await.unwrap();

        let other = (8u64,).signature().unwrap();
        assert!(cache.lookup(&key, &other).await.unwrap().is_miss());
    }

    #[tokio::test]
    async fn test_insert_evicts_oldest_at_capacity() {
        let (store, cache) = shared_cache(2, None);
        let key = CacheKey::new("tests::bounded");

        let first = entry_for(1, json!("a"));
        let second = entry_for(2, json!("b"));
        let third = entry_for(3, json!("c"));

        cache.insert(&key, &first).await.unwrap();
        cache.insert(&key, &second).await.unwrap();
        cache.insert(&key, &third).await.unwrap();

        assert_eq!(store.length(key.as_str()).await.unwrap(), 2);
        assert!(cache.lookup(&key, &first.signature).await.unwrap().is_miss());
        assert!(cache.lookup(&key, &second.signature).await.unwrap().is_hit());
        assert!(cache.lookup(&key, &third.signature).await.unwrap().is_hit());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_insert_below_capacity_does_not_evict() {
        let (store, cache) = shared_cache(5, None);
        let key = CacheKey::new("tests::roomy");

        cache.insert(&key, &entry_for(1, json!(1))).await.unwrap();
        cache.insert(&key, &entry_for(2, json!(2))).await.unwrap();

        assert_eq!(store.length(key.as_str()).await.unwrap(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_only_newest() {
        let (store, cache) = shared_cache(0, None);
        let key = CacheKey::new("tests::zero");

        let first = entry_for(1, json!(1));
        let second = entry_for(2, json!(2));
        cache.insert(&key, &first).await.unwrap();
        cache.insert(&key, &second).await.unwrap();

        // popping the empty list is a no-op, so one entry always remains
        assert_eq!(store.length(key.as_str()).await.unwrap(), 1);
        assert!(cache.lookup(&key, &first.signature).await.unwrap().is_miss());
        assert!(cache.lookup(&key, &second.signature).await.unwrap().is_hit());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_expired_records_purged_during_scan() {
        let (store, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::stale");

        let mut stale = entry_for(1, json!("old"));
        stale.created_at -= 11.0;
        stale.expire_seconds = Some(10);
        let live = entry_for(2, json!("new"));

        cache.insert(&key, &stale).await.unwrap();
        cache.insert(&key, &live).await.unwrap();

        let outcome = cache.lookup(&key, &live.signature).await.unwrap();
        assert_eq!(outcome, Lookup::Hit(live));

        // the scan removed the stale record from the backing list
        assert_eq!(store.length(key.as_str()).await.unwrap(), 1);
        assert_eq!(cache.stats().purged_expired, 1);
    }

    #[tokio::test]
    async fn test_expired_match_is_a_miss() {
        let (store, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::stale_match");

        let mut stale = entry_for(1, json!("old"));
        stale.created_at -= 11.0;
        stale.expire_seconds = Some(10);
        cache.insert(&key, &stale).await.unwrap();

        assert!(cache.lookup(&key, &stale.signature).await.unwrap().is_miss());
        assert_eq!(store.length(key.as_str()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_records_purged_during_scan() {
        let (store, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::corrupt");

        store.append_right(key.as_str(), b"garbage").await.unwrap();
        let live = entry_for(1, json!("ok"));
        cache.insert(&key, &live).await.unwrap();

        let outcome = cache.lookup(&key, &live.signature).await.unwrap();
        assert_eq!(outcome, Lookup::Hit(live));
        assert_eq!(store.length(key.as_str()).await.unwrap(), 1);
        assert_eq!(cache.stats().purged_malformed, 1);
    }

    #[tokio::test]
    async fn test_duplicate_signatures_first_match_wins() {
        let (_, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::dup");

        let older = entry_for(1, json!("older"));
        let mut newer = older.clone();
        newer.output = json!("newer");

        cache.insert(&key, &older).await.unwrap();
        cache.insert(&key, &newer).await.unwrap();

        let outcome = cache.lookup(&key, &older.signature).await.unwrap();
        assert_eq!(outcome, Lookup::Hit(older));
    }

    #[tokio::test]
    async fn test_touch_moves_record_to_tail() {
        let (store, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::promote");

        let first = entry_for(1, json!("a"));
        let second = entry_for(2, json!("b"));
        cache.insert(&key, &first).await.unwrap();
        cache.insert(&key, &second).await.unwrap();

        cache.touch(&key, &first).await.unwrap();

        let records = store.range_all(key.as_str()).await.unwrap();
        assert_eq!(records.len(), 2);
        let tail = decode_entry(records.last().unwrap()).unwrap();
        assert_eq!(tail.signature, first.signature);
    }

    #[tokio::test]
    async fn test_touch_does_not_duplicate() {
        let (store, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::no_dup");
        let entry = entry_for(1, json!(1));

        cache.insert(&key, &entry).await.unwrap();
        cache.touch(&key, &entry).await.unwrap();
        cache.touch(&key, &entry).await.unwrap();

        assert_eq!(store.length(key.as_str()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_racing_touches_duplicate_until_next_touch() {
        let inner = Arc::new(MemoryStore::new());
        let plain = MemoCache::new(Arc::clone(&inner), 10, None);
        let key = CacheKey::new("tests::racing");
        let entry = entry_for(1, json!(1));
        plain.insert(&key, &entry).await.unwrap();

        // both touches finish their remove before either append lands
        let gated = Arc::new(MemoCache::new(
            GatedAppendStore::new(Arc::clone(&inner), 2),
            10,
            None,
        ));
        let mut touches = Vec::new();
        for _ in 0..2 {
            let cache = Arc::clone(&gated);
            let key = key.clone();
            let entry = entry.clone();
            touches.push(tokio::spawn(async move {
                cache.touch(&key, &entry).await.unwrap();
            }));
        }
        for touch in touches {
            touch.await.unwrap();
        }

        assert_eq!(inner.length(key.as_str()).await.unwrap(), 2);

        // the following promotion removes every copy and re-appends one
        plain.touch(&key, &entry).await.unwrap();
        assert_eq!(inner.length(key.as_str()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_refreshes_global_ttl() {
        let (_, cache) = shared_cache(10, Some(1));
        let key = CacheKey::new("tests::refreshed");

        let first = entry_for(1, json!(1));
        cache.insert(&key, &first).await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        cache.insert(&key, &entry_for(2, json!(2))).await.unwrap();

        // past the first insert's deadline, alive thanks to the second
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(cache.lookup(&key, &first.signature).await.unwrap().is_hit());
    }

    #[tokio::test]
    async fn test_touch_does_not_refresh_global_ttl() {
        let (_, cache) = shared_cache(10, Some(1));
        let key = CacheKey::new("tests::unrefreshed");

        // two records, so the touch never empties the key
        let touched = entry_for(1, json!(1));
        let other = entry_for(2, json!(2));
        cache.insert(&key, &touched).await.unwrap();
        cache.insert(&key, &other).await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        cache.touch(&key, &touched).await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(cache
            .lookup(&key, &touched.signature)
            .await
            .unwrap()
            .is_miss());
    }

    #[tokio::test]
    async fn test_touching_sole_record_sheds_global_ttl() {
        let (_, cache) = shared_cache(10, Some(1));
        let key = CacheKey::new("tests::sole");

        let entry = entry_for(1, json!(1));
        cache.insert(&key, &entry).await.unwrap();
        cache.touch(&key, &entry).await.unwrap();

        // the touch recreated the key without a TTL
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.lookup(&key, &entry.signature).await.unwrap().is_hit());
    }

    #[tokio::test]
    async fn test_remove_entry_purges_record() {
        let (store, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::removed");
        let entry = entry_for(1, json!(1));

        cache.insert(&key, &entry).await.unwrap();
        cache.remove_entry(&key, &entry).await.unwrap();

        assert_eq!(store.length(key.as_str()).await.unwrap(), 0);
        assert!(cache.lookup(&key, &entry.signature).await.unwrap().is_miss());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let (store, cache) = shared_cache(10, None);
        let key_a = CacheKey::new("tests::a");
        let key_b = CacheKey::new("tests::b");

        cache.insert(&key_a, &entry_for(1, json!(1))).await.unwrap();
        cache.insert(&key_b, &entry_for(2, json!(2))).await.unwrap();

        cache.delete(&key_a).await.unwrap();
        assert_eq!(store.length(key_a.as_str()).await.unwrap(), 0);
        assert_eq!(store.length(key_b.as_str()).await.unwrap(), 1);

        cache.clear().await.unwrap();
        assert_eq!(store.length(key_b.as_str()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let (_, cache) = shared_cache(10, None);
        let key = CacheKey::new("tests::counted");
        let entry = entry_for(1, json!(1));

        cache.insert(&key, &entry).await.unwrap();
        cache.lookup(&key, &entry.signature).await.unwrap();
        let other = (99u64,).signature().unwrap();
        cache.lookup(&key, &other).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
