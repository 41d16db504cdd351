//! Tower integration for caches.

use crate::Cache;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::task::{Context, Poll};
use tower_service::Service;

/// A [`Service`] that answers each key with the cache's `get`.
///
/// This lets a cache sit at the bottom of a tower stack, e.g. behind a
/// timeout or a rate limiter.
///
/// # Example
///
/// ```rust
/// use layercache::{Cache, CacheExt, MapCache};
/// use tower::{Service, ServiceExt};
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = MapCache::new();
/// cache.set("key", 7).await.unwrap();
///
/// let mut service = cache.into_service();
/// let value = service.ready().await.unwrap().call("key").await.unwrap();
/// assert_eq!(value, Some(7));
/// # }
/// ```
pub struct CacheService<C, K, V> {
    cache: C,
    _types: PhantomData<fn(K) -> V>,
}

impl<C, K, V> CacheService<C, K, V> {
    /// Wraps `cache` as a service.
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            _types: PhantomData,
        }
    }

    /// Returns a reference to the wrapped cache.
    pub fn get_ref(&self) -> &C {
        &self.cache
    }

    /// Consumes the service and returns the wrapped cache.
    pub fn into_inner(self) -> C {
        self.cache
    }
}

impl<C: Clone, K, V> Clone for CacheService<C, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.cache.clone())
    }
}

impl<C, K, V> Service<K> for CacheService<C, K, V>
where
    C: Cache<K, V>,
{
    type Response = Option<V>;
    type Error = C::Error;
    type Future = BoxFuture<'static, Result<Option<V>, C::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, key: K) -> Self::Future {
        self.cache.get(key)
    }
}
