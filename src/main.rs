//! memolist demo - memoizes a few slow functions over an in-process store
//!
//! Runs each workload cold and warm, shows concurrent callers collapsing
//! into one computation, and dumps the cache counters at the end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memolist::{cache_key, Config, MemoCache, MemoryStore, Memoized};

/// Naive doubly-recursive Fibonacci, expensive enough to be worth caching.
fn fib(n: u64) -> u64 {
    if n < 2 {
        1
    } else {
        fib(n - 1) + fib(n - 2)
    }
}

/// Pretends to be a slow remote call.
async fn greet(name: &str) -> String {
    tokio::time::sleep(Duration::from_secs(2)).await;
    format!("Hello {name}")
}

static SQUARINGS: AtomicUsize = AtomicUsize::new(0);

/// Slow squaring with a computation counter, for the concurrency demo.
async fn slow_square(n: u64) -> u64 {
    SQUARINGS.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(1)).await;
    n * n
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memolist=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memolist demo");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: max_size={}, global_expire={:?}, store={}:{}/{}",
        config.max_size, config.global_expire, config.store.host, config.store.port, config.store.db
    );

    // In-process store; a remote ListStore implementation would dial
    // config.store instead.
    let cache = Arc::new(MemoCache::from_config(MemoryStore::new(), &config));

    let memo_fib = Memoized::new(Arc::clone(&cache), cache_key!(fib)).with_expire(100);
    let memo_greet = Memoized::new(Arc::clone(&cache), cache_key!(greet)).with_expire(10);
    let memo_square = Memoized::new(Arc::clone(&cache), cache_key!(slow_square));

    // Cold call computes, warm call is served from the store
    let started = Instant::now();
    let cold = memo_fib.call((30u64,), |(n,)| async move { fib(n) }).await;
    info!("fib(30) = {} (cold: {:?})", cold, started.elapsed());

    let started = Instant::now();
    let warm = memo_fib.call((30u64,), |(n,)| async move { fib(n) }).await;
    info!("fib(30) = {} (warm: {:?})", warm, started.elapsed());

    let started = Instant::now();
    let uncached = fib(30);
    info!("fib(30) = {} (uncached: {:?})", uncached, started.elapsed());

    let started = Instant::now();
    let greeting = memo_greet.call(("World",), |(name,)| greet(name)).await;
    info!("{} (cold: {:?})", greeting, started.elapsed());

    let started = Instant::now();
    let greeting = memo_greet.call(("World",), |(name,)| greet(name)).await;
    info!("{} (warm: {:?})", greeting, started.elapsed());

    // Concurrent misses collapse into a single computation
    let started = Instant::now();
    let mut workers = Vec::new();
    for _ in 0..4 {
        let memo = memo_square.clone();
        workers.push(tokio::spawn(async move {
            memo.call((9u64,), |(n,)| slow_square(n)).await
        }));
    }
    let mut squared = 0;
    for worker in workers {
        squared = worker.await?;
    }
    info!(
        "4 concurrent slow_square(9) calls returned {} in {:?}, computed {} time(s)",
        squared,
        started.elapsed(),
        SQUARINGS.load(Ordering::SeqCst)
    );

    let stats = cache.stats();
    info!("Cache stats: {}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
