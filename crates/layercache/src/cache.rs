//! The async cache contract.

use crate::{CacheService, ReuseInflight};
use futures::future::BoxFuture;
use std::hash::Hash;

/// An asynchronous key/value cache.
///
/// Every operation returns a `'static` boxed future, so implementations keep
/// their state behind shared ownership and are cheap to clone.
pub trait Cache<K, V>: Clone + Send + Sync + 'static {
    /// Error returned by the cache's operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the value stored under `key`, if any.
    fn get(&self, key: K) -> BoxFuture<'static, Result<Option<V>, Self::Error>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: K, value: V) -> BoxFuture<'static, Result<(), Self::Error>>;

    /// Removes the value stored under `key`.
    fn evict(&self, key: K) -> BoxFuture<'static, Result<(), Self::Error>>;

    /// Removes every value.
    fn evict_all(&self) -> BoxFuture<'static, Result<(), Self::Error>>;
}

/// Combinators available on every [`Cache`].
pub trait CacheExt<K, V>: Cache<K, V> + Sized {
    /// Shares concurrent `get`s for the same key.
    ///
    /// See [`ReuseInflight`].
    fn reuse_inflight(self) -> ReuseInflight<Self, K, V>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        ReuseInflight::new(self)
    }

    /// Exposes `get` as a [`tower_service::Service`].
    fn into_service(self) -> CacheService<Self, K, V> {
        CacheService::new(self)
    }
}

impl<C, K, V> CacheExt<K, V> for C where C: Cache<K, V> {}
