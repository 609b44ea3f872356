//! Single-Flight Module
//!
//! Per-(key, signature) coordination so that concurrent misses run the
//! wrapped function once while the rest wait for the winner's entry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cache::{ArgSignature, CacheKey};

/// One flight per (cache key, signature) pair.
type FlightKey = (CacheKey, ArgSignature);

// == Flight Group ==
/// Registry of in-flight computations, scoped to one process.
///
/// The leader of a flight holds the lock inside its registry entry for the
/// duration of its computation; followers wait on that lock and re-check
/// the cache once it opens. The std mutex around the registry is only ever
/// held for map operations, never across an await.
#[derive(Debug, Clone, Default)]
pub(crate) struct FlightGroup {
    flights: Arc<Mutex<HashMap<FlightKey, Arc<AsyncMutex<()>>>>>,
}

// == Flight ==
/// What joining the group handed back: leadership of a new flight, or the
/// lock of an existing one to wait on.
pub(crate) enum Flight {
    Leader(FlightPermit),
    Follower(Arc<AsyncMutex<()>>),
}

// == Flight Permit ==
/// Leadership over one flight.
///
/// Dropping the permit retires the flight and wakes every follower; this
/// also happens when the leader fails or panics, so waiters are never
/// stranded. The registry entry is removed before the lock opens, so a
/// woken follower that misses again starts a fresh flight instead of
/// waiting on a finished one.
#[derive(Debug)]
pub(crate) struct FlightPermit {
    group: FlightGroup,
    key: FlightKey,
    _guard: OwnedMutexGuard<()>,
}

impl FlightGroup {
    /// Joins the flight for `(key, signature)`, creating it if absent.
    ///
    /// The new flight's lock is acquired before the registry entry becomes
    /// visible, so followers can never grab it first.
    pub(crate) fn join(&self, key: &CacheKey, signature: &ArgSignature) -> Flight {
        let flight_key = (key.clone(), signature.clone());
        let mut flights = self.lock_registry();

        match flights.entry(flight_key) {
            Entry::Occupied(active) => Flight::Follower(Arc::clone(active.get())),
            Entry::Vacant(slot) => {
                let lock = Arc::new(AsyncMutex::new(()));
                let guard = Arc::clone(&lock)
                    .try_lock_owned()
                    .expect("fresh flight lock is uncontended");
                let key = slot.key().clone();
                slot.insert(lock);
                Flight::Leader(FlightPermit {
                    group: self.clone(),
                    key,
                    _guard: guard,
                })
            }
        }
    }

    fn retire(&self, key: &FlightKey) {
        self.lock_registry().remove(key);
    }

    /// A poisoned registry only means another flight panicked; the map
    /// itself is still usable.
    fn lock_registry(&self) -> MutexGuard<'_, HashMap<FlightKey, Arc<AsyncMutex<()>>>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn active_flights(&self) -> usize {
        self.lock_registry().len()
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        // retire first; the held guard is released after this body runs
        self.group.retire(&self.key);
    }
}
