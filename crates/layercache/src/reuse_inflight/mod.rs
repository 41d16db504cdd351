//! Sharing of concurrent fetches for the same key.

mod config;
mod events;

pub use config::{ReuseInflightConfig, ReuseInflightConfigBuilder};
pub use events::ReuseInflightEvent;

use crate::{Cache, ReuseInflightError};
use futures::future::{BoxFuture, FutureExt, TryFutureExt};
use hashbrown::HashMap;
use layercache_deferred::{on_cancel, Deferred, DeferredBuilder};
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

type Fetch<V, E> = Deferred<Option<V>, E>;

/// A cache wrapper that lets concurrent `get`s for one key share a fetch.
///
/// The first `get` for a key spawns the wrapped cache's `get` as a
/// [`Deferred`]; every `get` for the same key that arrives before it settles
/// waits on that same task. Once the fetch settles, in any state, the key is
/// forgotten and the next `get` starts afresh. A fetch that is cancelled or
/// fails is reported as [`ReuseInflightEvent::Abandoned`].
///
/// Dropping a caller's future does not stop the shared fetch; use
/// [`cancel_inflight`](Self::cancel_inflight) for that.
///
/// # Example
///
/// ```rust
/// use layercache::{Cache, CacheExt, MapCache};
///
/// # #[tokio::main]
/// # async fn main() {
/// let backing = MapCache::new();
/// backing.set("user:1", "ada").await.unwrap();
///
/// let cache = backing.reuse_inflight();
/// let (a, b) = tokio::join!(cache.get("user:1"), cache.get("user:1"));
/// assert_eq!(a.unwrap(), Some("ada"));
/// assert_eq!(b.unwrap(), Some("ada"));
/// # }
/// ```
pub struct ReuseInflight<C, K, V>
where
    C: Cache<K, V>,
{
    inner: C,
    config: Arc<ReuseInflightConfig>,
    in_flight: Arc<Mutex<HashMap<K, Fetch<V, C::Error>>>>,
}

impl<C, K, V> ReuseInflight<C, K, V>
where
    C: Cache<K, V>,
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Wraps `inner` with the default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, ReuseInflightConfig::default())
    }

    /// Wraps `inner` with the given configuration.
    pub fn with_config(inner: C, config: ReuseInflightConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "reuse_inflight_requests_total",
                "Total number of gets seen by the in-flight reuse wrapper"
            );
            describe_counter!(
                "reuse_inflight_abandoned_total",
                "Total number of shared fetches that were cancelled or failed"
            );
        }

        Self {
            inner,
            config: Arc::new(config),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a reference to the wrapped cache.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Returns the number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .values()
            .filter(|fetch| !fetch.is_completed())
            .count()
    }

    /// Cancels the fetch in flight for `key`, if there is one.
    ///
    /// Every caller waiting on it receives [`ReuseInflightError::Cancelled`].
    pub fn cancel_inflight(&self, key: &K) -> bool {
        // Cancelling runs the removal handler, which takes the map lock.
        let fetch = self.in_flight.lock().get(key).cloned();
        fetch.is_some_and(|fetch| fetch.cancel())
    }

    /// Returns the fetch in flight for `key`, starting one if needed.
    fn fetch(&self, key: K) -> Fetch<V, C::Error> {
        let mut in_flight = self.in_flight.lock();
        // A settled entry whose removal has not run yet counts as absent.
        if let Some(existing) = in_flight.get(&key).filter(|f| !f.is_completed()) {
            let existing = existing.clone();
            drop(in_flight);
            self.record_role("waiter");
            return existing;
        }

        // The read starts only once the completion handlers are queued, so
        // they run before any waiter resumes.
        let (start, started) = oneshot::channel::<()>();
        let inner = self.inner.clone();
        let fetch_key = key.clone();
        let fetch = DeferredBuilder::new()
            .name(self.config.name.clone())
            .spawn(async move {
                let _ = started.await;
                inner.get(fetch_key).await
            });
        in_flight.insert(key.clone(), fetch.clone());
        drop(in_flight);

        let map = Arc::clone(&self.in_flight);
        let registered = fetch.clone();
        fetch.invoke_on_completion(move |_| {
            let mut map = map.lock();
            if map.get(&key).is_some_and(|f| f.ptr_eq(&registered)) {
                map.remove(&key);
            }
        });

        let config = Arc::clone(&self.config);
        on_cancel(&fetch, move |err| {
            #[cfg(feature = "metrics")]
            counter!("reuse_inflight_abandoned_total", "cache" => config.name.clone())
                .increment(1);

            #[cfg(feature = "tracing")]
            warn!(cache = %config.name, cancelled = err.is_cancelled(), "Shared fetch abandoned");

            config.emit(&ReuseInflightEvent::Abandoned {
                source_name: config.name.clone(),
                timestamp: Instant::now(),
                cancelled: err.is_cancelled(),
            });
        });

        self.record_role("leader");
        let _ = start.send(());
        fetch
    }

    fn record_role(&self, role: &'static str) {
        #[cfg(feature = "metrics")]
        counter!(
            "reuse_inflight_requests_total",
            "cache" => self.config.name.clone(),
            "role" => role
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, role, "Get routed through in-flight reuse");

        let source_name = self.config.name.clone();
        let timestamp = Instant::now();
        let event = if role == "leader" {
            ReuseInflightEvent::Led {
                source_name,
                timestamp,
            }
        } else {
            ReuseInflightEvent::Joined {
                source_name,
                timestamp,
            }
        };
        self.config.emit(&event);
    }
}

impl<C, K, V> Clone for ReuseInflight<C, K, V>
where
    C: Cache<K, V>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<C, K, V> Cache<K, V> for ReuseInflight<C, K, V>
where
    C: Cache<K, V>,
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Error = ReuseInflightError<C::Error>;

    fn get(&self, key: K) -> BoxFuture<'static, Result<Option<V>, Self::Error>> {
        // Resolve the fetch when polled, so the spawn happens on a runtime.
        let this = self.clone();
        async move { this.fetch(key).wait().await.map_err(ReuseInflightError::from) }.boxed()
    }

    fn set(&self, key: K, value: V) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.inner
            .set(key, value)
            .map_err(|e| ReuseInflightError::Cache(Arc::new(e)))
            .boxed()
    }

    fn evict(&self, key: K) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.inner
            .evict(key)
            .map_err(|e| ReuseInflightError::Cache(Arc::new(e)))
            .boxed()
    }

    fn evict_all(&self) -> BoxFuture<'static, Result<(), Self::Error>> {
        self.inner
            .evict_all()
            .map_err(|e| ReuseInflightError::Cache(Arc::new(e)))
            .boxed()
    }
}
