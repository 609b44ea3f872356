//! Memoization Wrapper Module
//!
//! The decorator around one cached function: hit and miss orchestration,
//! single-flight misses, and fail-open behavior when the store is down.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::ListStore;
use crate::cache::{ArgSpec, CacheEntry, CacheKey, Lookup, MemoCache};
use crate::memo::flight::{Flight, FlightGroup};

// == Memoized ==
/// Memoizes one function behind an explicitly injected cache.
///
/// Built once per wrapped function with its fully qualified identity;
/// cloning is cheap and clones share the cache and the flight registry.
/// While the store is reachable, the function runs at most once per
/// (key, signature) among this process's concurrent callers. When the
/// store errors, calls bypass the cache and invoke the function directly.
pub struct Memoized<S> {
    cache: Arc<MemoCache<S>>,
    key: CacheKey,
    expire: Option<u64>,
    flights: FlightGroup,
}

impl<S> Clone for Memoized<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            key: self.key.clone(),
            expire: self.expire,
            flights: self.flights.clone(),
        }
    }
}

impl<S: ListStore> Memoized<S> {
    // == Constructor ==
    /// Wraps the function identified by `key` over `cache`.
    ///
    /// The key should be the function's fully qualified name, for example
    /// via [`cache_key!`](crate::cache_key); bare short names collide
    /// across modules.
    pub fn new(cache: Arc<MemoCache<S>>, key: CacheKey) -> Self {
        Self {
            cache,
            key,
            expire: None,
            flights: FlightGroup::default(),
        }
    }

    /// Sets the per-entry TTL in seconds for entries this wrapper creates.
    #[must_use]
    pub fn with_expire(mut self, seconds: u64) -> Self {
        self.expire = Some(seconds);
        self
    }

    /// The key this wrapper stores under.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    // == Call ==
    /// Calls the memoized function.
    ///
    /// On a hit the cached output is returned without invoking `func`; on a
    /// miss `func` runs, once across this process's concurrent callers, and
    /// its output is cached. Cache-layer failures never surface here; the
    /// call falls back to invoking `func` directly.
    pub async fn call<A, R, F, Fut>(&self, args: A, func: F) -> R
    where
        A: ArgSpec,
        R: Serialize + DeserializeOwned,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = R>,
    {
        let outcome: Result<R, Infallible> = self
            .try_call(args, move |args| {
                let fut = func(args);
                async move { Ok(fut.await) }
            })
            .await;

        match outcome {
            Ok(output) => output,
            Err(never) => match never {},
        }
    }

    // == Try Call ==
    /// Calls the memoized fallible function.
    ///
    /// Only `Ok` outputs are cached. An `Err` propagates unchanged, is never
    /// stored, and retires the flight so a waiting caller retries as the new
    /// leader.
    pub async fn try_call<A, R, E, F, Fut>(&self, args: A, func: F) -> Result<R, E>
    where
        A: ArgSpec,
        R: Serialize + DeserializeOwned,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let signature = match args.signature() {
            Ok(signature) => signature,
            Err(err) => {
                warn!(key = %self.key, error = %err, "arguments failed to encode, bypassing cache");
                return func(args).await;
            }
        };

        // Fast path: a live entry already carries this signature.
        match self.cache.lookup(&self.key, &signature).await {
            Ok(Lookup::Hit(entry)) => {
                if let Some(output) = self.use_hit(&entry).await {
                    return Ok(output);
                }
            }
            Ok(Lookup::Miss) => {}
            Err(err) => {
                warn!(key = %self.key, error = %err, "store unavailable, bypassing cache");
                return func(args).await;
            }
        }

        // Miss: resolve through the flight registry. A follower wakes when
        // the leader's flight retires and looks again; on a store failure it
        // stops waiting and calls the function directly.
        let permit = loop {
            match self.flights.join(&self.key, &signature) {
                Flight::Leader(permit) => break Some(permit),
                Flight::Follower(lock) => {
                    drop(lock.lock().await);
                    match self.cache.lookup(&self.key, &signature).await {
                        Ok(Lookup::Hit(entry)) => {
                            if let Some(output) = self.use_hit(&entry).await {
                                return Ok(output);
                            }
                        }
                        Ok(Lookup::Miss) => {}
                        Err(err) => {
                            warn!(key = %self.key, error = %err, "store unavailable, bypassing cache");
                            break None;
                        }
                    }
                }
            }
        };

        if permit.is_some() {
            // A flight may have completed between the miss above and taking
            // leadership; check once more before paying for the computation.
            if let Ok(Lookup::Hit(entry)) = self.cache.lookup(&self.key, &signature).await {
                if let Some(output) = self.use_hit(&entry).await {
                    return Ok(output);
                }
            }
        }

        let output = func(args).await?;

        if permit.is_some() {
            match serde_json::to_value(&output) {
                Ok(value) => {
                    let entry = CacheEntry::new(signature, value, self.expire);
                    // the permit outlives the insert, so followers wake to a
                    // visible entry
                    if let Err(err) = self.cache.insert(&self.key, &entry).await {
                        warn!(key = %self.key, error = %err, "failed to store output, returning it uncached");
                    }
                }
                Err(err) => {
                    warn!(key = %self.key, error = %err, "output failed to encode, returning it uncached");
                }
            }
            debug!(key = %self.key, "cache miss");
        }

        Ok(output)
    }

    /// Decodes a hit's output and promotes the entry.
    ///
    /// Returns None when the stored output no longer decodes into the
    /// caller's type; the record is purged so the next call recomputes
    /// instead of tripping over it again.
    async fn use_hit<R: DeserializeOwned>(&self, entry: &CacheEntry) -> Option<R> {
        match serde_json::from_value(entry.output.clone()) {
            Ok(output) => {
                if let Err(err) = self.cache.touch(&self.key, entry).await {
                    warn!(key = %self.key, error = %err, "failed to promote entry after hit");
                }
                debug!(key = %self.key, signature = %entry.signature, "cache hit");
                Some(output)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "cached output no longer decodes, purging");
                if let Err(err) = self.cache.remove_entry(&self.key, entry).await {
                    warn!(key = %self.key, error = %err, "failed to purge unusable record");
                }
                None
            }
        }
    }
}
