//! Single-caller behaviour of the in-flight reuse wrapper.

use super::{SlowCache, TestError};
use futures::future::{self, BoxFuture, FutureExt};
use layercache::{Cache, CacheExt, ReuseInflight, ReuseInflightConfig, ReuseInflightError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn get_reads_through() {
    let backing = SlowCache::new(Duration::from_millis(5));
    backing.set("a".into(), "alpha".into()).await.unwrap();
    let cache = backing.clone().reuse_inflight();

    assert_eq!(cache.get("a".into()).await.unwrap(), Some("alpha".into()));
    assert_eq!(cache.get("missing".into()).await.unwrap(), None);
    assert_eq!(backing.reads(), 2);
}

#[tokio::test]
async fn sequential_gets_fetch_again() {
    let backing = SlowCache::new(Duration::from_millis(5));
    let cache = backing.clone().reuse_inflight();

    cache.get("a".into()).await.unwrap();
    cache.get("a".into()).await.unwrap();

    assert_eq!(backing.reads(), 2);
}

#[tokio::test]
async fn failure_is_reported_and_forgotten() {
    let backing = SlowCache::new(Duration::from_millis(5));
    backing.set("a".into(), "alpha".into()).await.unwrap();
    let cache = backing.clone().reuse_inflight();

    backing.fail_reads(true);
    let err = cache.get("a".into()).await.unwrap_err();
    assert_eq!(
        err.cache_error().map(|e| &**e),
        Some(&TestError::new("backing store unavailable"))
    );

    backing.fail_reads(false);
    assert_eq!(cache.in_flight(), 0);
    assert_eq!(cache.get("a".into()).await.unwrap(), Some("alpha".into()));
}

#[tokio::test]
async fn cancel_inflight_fails_waiters_and_allows_retry() {
    let backing = SlowCache::new(Duration::from_millis(200));
    backing.set("a".into(), "alpha".into()).await.unwrap();
    let cache = backing.clone().reuse_inflight();

    let pending = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("a".into()).await }
    });
    while cache.in_flight() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(cache.cancel_inflight(&"a".to_string()));
    let err = pending.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(cache.in_flight(), 0);

    assert_eq!(cache.get("a".into()).await.unwrap(), Some("alpha".into()));
}

#[tokio::test]
async fn abandoned_events_tell_cancel_from_failure() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let (c, f) = (Arc::clone(&cancelled), Arc::clone(&failed));

    let config = ReuseInflightConfig::builder()
        .name("abandon-test")
        .on_abandoned(move |was_cancelled| {
            if was_cancelled {
                c.fetch_add(1, Ordering::SeqCst);
            } else {
                f.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();
    let backing = SlowCache::new(Duration::from_millis(100));
    let cache = ReuseInflight::with_config(backing.clone(), config);

    // Failure
    backing.fail_reads(true);
    assert!(cache.get("a".into()).await.is_err());

    // Cancellation
    backing.fail_reads(false);
    let pending = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get("b".into()).await }
    });
    while cache.in_flight() == 0 {
        tokio::task::yield_now().await;
    }
    cache.cancel_inflight(&"b".to_string());
    let _ = pending.await.unwrap();

    // Success is not an abandonment
    assert!(cache.get("c".into()).await.is_ok());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(failed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn writes_pass_through() {
    let backing = SlowCache::new(Duration::from_millis(1));
    let cache = backing.clone().reuse_inflight();

    cache.set("a".into(), "alpha".into()).await.unwrap();
    assert_eq!(backing.get("a".into()).await.unwrap(), Some("alpha".into()));

    cache.evict("a".into()).await.unwrap();
    assert_eq!(cache.get("a".into()).await.unwrap(), None);
}

#[tokio::test]
async fn wrapper_works_as_a_service() {
    let backing = SlowCache::new(Duration::from_millis(1));
    backing.set("a".into(), "alpha".into()).await.unwrap();
    let service = backing.reuse_inflight().into_service();

    let value: Result<Option<String>, ReuseInflightError<TestError>> =
        service.oneshot("a".to_string()).await;
    assert_eq!(value.unwrap(), Some("alpha".into()));
}

/// Fails its first read and answers `Some(1)` afterwards.
#[derive(Clone, Default)]
struct FlakyCache {
    reads: Arc<AtomicUsize>,
}

impl Cache<u64, u64> for FlakyCache {
    type Error = TestError;

    fn get(&self, _key: u64) -> BoxFuture<'static, Result<Option<u64>, TestError>> {
        let first = self.reads.fetch_add(1, Ordering::SeqCst) == 0;
        future::ready(if first {
            Err(TestError::new("flaky"))
        } else {
            Ok(Some(1))
        })
        .boxed()
    }

    fn set(&self, _key: u64, _value: u64) -> BoxFuture<'static, Result<(), TestError>> {
        future::ready(Ok(())).boxed()
    }

    fn evict(&self, _key: u64) -> BoxFuture<'static, Result<(), TestError>> {
        future::ready(Ok(())).boxed()
    }

    fn evict_all(&self) -> BoxFuture<'static, Result<(), TestError>> {
        future::ready(Ok(())).boxed()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_fetch_is_never_handed_out_on_a_busy_runtime() {
    // A slow leader listener plus blocking work keeps the only worker busy
    // while the first fetch settles.
    let config = ReuseInflightConfig::builder()
        .name("flaky")
        .on_led(|| {
            std::thread::sleep(Duration::from_millis(20));
            tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_millis(100)));
        })
        .build();
    let backing = FlakyCache::default();
    let cache = ReuseInflight::with_config(backing.clone(), config);

    let first = cache.get(1).await;
    assert_eq!(
        first.unwrap_err().cache_error().map(|e| &**e),
        Some(&TestError::new("flaky"))
    );
    assert_eq!(cache.in_flight(), 0);

    let second = cache.get(1).await;
    assert_eq!(second.unwrap(), Some(1));
    assert_eq!(backing.reads.load(Ordering::SeqCst), 2);
}
