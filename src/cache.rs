use parking_lot::RwLock;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics;

/// Default validity window for balance and position reads.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
struct CachedValue<T> {
    value: T,
    fetched_at: Instant,
}

/// A single lazily refreshed value with a fixed validity window.
///
/// Readers share the lock to check freshness. The refresh runs with no lock held and only
/// the final store takes the write lock, so a slow exchange call never blocks readers of a
/// fresh value. Concurrent callers that all find the value expired may each fetch; the last
/// store wins. Failed fetches leave the slot untouched.
#[derive(Debug)]
pub struct TimedCache<T> {
    name: &'static str,
    ttl: Duration,
    slot: RwLock<Option<CachedValue<T>>>,
}

impl<T: Clone> TimedCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Return the cached value if still valid, otherwise run `fetch` and store its result.
    pub async fn get<F, Fut, E>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh() {
            return Ok(value);
        }

        metrics::inc_cache_lookup(self.name, false);
        debug!(cache = self.name, "Cache expired or empty, fetching");

        let value = fetch().await?;

        *self.slot.write() = Some(CachedValue {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drop the stored value so the next `get` fetches.
    pub fn invalidate(&self) {
        self.slot.write().take();
    }

    fn fresh(&self) -> Option<T> {
        let slot = self.slot.read();
        let entry = slot.as_ref()?;
        let age = entry.fetched_at.elapsed();
        if age >= self.ttl {
            return None;
        }

        metrics::inc_cache_lookup(self.name, true);
        debug!(
            cache = self.name,
            age_secs = age.as_secs_f64(),
            "Serving cached value"
        );
        Some(entry.value.clone())
    }

    #[cfg(test)]
    fn fetched_at(&self) -> Option<Instant> {
        self.slot.read().as_ref().map(|entry| entry.fetched_at)
    }
}
