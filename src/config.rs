//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;

use crate::cache::DEFAULT_MAX_SIZE;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Read once at startup; later environment changes do not affect a built cache.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries kept per cached function
    pub max_size: usize,
    /// Optional whole-key TTL in seconds, refreshed on every insert
    pub global_expire: Option<u64>,
    /// Backing store connection parameters
    pub store: StoreConfig,
}

/// Connection parameters for a remote backing store.
///
/// Consumed by remote `ListStore` implementations; the in-process
/// `MemoryStore` ignores them.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store host name
    pub host: String,
    /// Store port
    pub port: u16,
    /// Store database index
    pub db: u32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMOLIST_MAX_SIZE` - Entries kept per cached function (default: 10000)
    /// - `MEMOLIST_GLOBAL_EXPIRE` - Whole-key TTL in seconds (default: unset)
    /// - `MEMOLIST_STORE_HOST` - Backing store host (default: localhost)
    /// - `MEMOLIST_STORE_PORT` - Backing store port (default: 6379)
    /// - `MEMOLIST_STORE_DB` - Backing store database index (default: 0)
    pub fn from_env() -> Self {
        Self {
            max_size: env::var("MEMOLIST_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_SIZE),
            global_expire: env::var("MEMOLIST_GLOBAL_EXPIRE")
                .ok()
                .and_then(|v| v.parse().ok()),
            store: StoreConfig {
                host: env::var("MEMOLIST_STORE_HOST")
                    .unwrap_or_else(|_| "localhost".to_string()),
                port: env::var("MEMOLIST_STORE_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(6379),
                db: env::var("MEMOLIST_STORE_DB")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            global_expire: None,
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}
