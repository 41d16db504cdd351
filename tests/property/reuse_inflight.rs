//! Property tests for in-flight reuse.
//!
//! Invariants tested:
//! - Concurrent gets read the backing cache once per distinct key
//! - Every get for a key returns the stored value
//! - Nothing stays in flight once all gets returned

use layercache::{Cache, CacheExt, MapCache};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: one backing read per distinct key among concurrent gets
    #[test]
    fn one_read_per_distinct_key(keys in vec(0u8..8, 1..40)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let backing = MapCache::new();
            for key in 0u8..8 {
                backing.set(key, u32::from(key) * 10).await.unwrap();
            }

            let reads = Arc::new(AtomicUsize::new(0));
            let counted = CountingCache { inner: backing, reads: Arc::clone(&reads) };
            let cache = counted.reuse_inflight();

            let results = futures::future::join_all(keys.iter().map(|k| cache.get(*k))).await;

            for (key, result) in keys.iter().zip(results) {
                prop_assert_eq!(result.unwrap(), Some(u32::from(*key) * 10));
            }
            let distinct: HashSet<_> = keys.iter().collect();
            prop_assert_eq!(reads.load(Ordering::SeqCst), distinct.len());

            prop_assert_eq!(cache.in_flight(), 0);
            Ok(())
        })?;
    }
}

/// Counts reads and delays them so concurrent gets overlap.
#[derive(Clone)]
struct CountingCache {
    inner: MapCache<u8, u32>,
    reads: Arc<AtomicUsize>,
}

impl Cache<u8, u32> for CountingCache {
    type Error = std::convert::Infallible;

    fn get(
        &self,
        key: u8,
    ) -> futures::future::BoxFuture<'static, Result<Option<u32>, Self::Error>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let read = self.inner.get(key);
        Box::pin(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            read.await
        })
    }

    fn set(
        &self,
        key: u8,
        value: u32,
    ) -> futures::future::BoxFuture<'static, Result<(), Self::Error>> {
        self.inner.set(key, value)
    }

    fn evict(&self, key: u8) -> futures::future::BoxFuture<'static, Result<(), Self::Error>> {
        self.inner.evict(key)
    }

    fn evict_all(&self) -> futures::future::BoxFuture<'static, Result<(), Self::Error>> {
        self.inner.evict_all()
    }
}
