//! In-memory cache backed by a hash map.

use crate::Cache;
use futures::future::{self, BoxFuture, FutureExt};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::Arc;

/// An unbounded in-memory [`Cache`].
///
/// Clones share the same entries. There is no capacity limit and nothing is
/// ever evicted implicitly.
pub struct MapCache<K, V> {
    entries: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> MapCache<K, V>
where
    K: Hash + Eq,
{
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> Default for MapCache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for MapCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K, V> Cache<K, V> for MapCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Error = Infallible;

    fn get(&self, key: K) -> BoxFuture<'static, Result<Option<V>, Infallible>> {
        let value = self.entries.read().get(&key).cloned();
        future::ready(Ok(value)).boxed()
    }

    fn set(&self, key: K, value: V) -> BoxFuture<'static, Result<(), Infallible>> {
        self.entries.write().insert(key, value);
        future::ready(Ok(())).boxed()
    }

    fn evict(&self, key: K) -> BoxFuture<'static, Result<(), Infallible>> {
        self.entries.write().remove(&key);
        future::ready(Ok(())).boxed()
    }

    fn evict_all(&self) -> BoxFuture<'static, Result<(), Infallible>> {
        self.entries.write().clear();
        future::ready(Ok(())).boxed()
    }
}
