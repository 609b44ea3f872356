//! Memoization Module
//!
//! Per-call-site wrappers around the cache engine, plus the single-flight
//! coordination for concurrent misses.

mod flight;
mod wrapper;

pub use wrapper::Memoized;

// == Cache Key Macro ==
/// Builds a [`CacheKey`](crate::cache::CacheKey) from the enclosing module
/// path and a function name.
///
/// A bare short name is a collision hazard once two modules cache functions
/// with the same name; this renders `my_crate::my_module::my_fn` instead.
#[macro_export]
macro_rules! cache_key {
    ($name:ident) => {
        $crate::cache::CacheKey::new(concat!(module_path!(), "::", stringify!($name)))
    };
}
