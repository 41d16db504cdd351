//! Concurrent gets sharing fetches.

use super::SlowCache;
use futures::future::join_all;
use layercache::{Cache, CacheExt, ReuseInflight, ReuseInflightConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_gets_share_one_read() {
    let backing = SlowCache::new(Duration::from_millis(150));
    backing.set("k".into(), "value".into()).await.unwrap();
    let cache = backing.clone().reuse_inflight();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("k".into()).await })
        })
        .collect();

    for result in join_all(handles).await {
        assert_eq!(result.unwrap().unwrap(), Some("value".into()));
    }
    assert_eq!(backing.reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_read_separately() {
    let backing = SlowCache::new(Duration::from_millis(150));
    let cache = backing.clone().reuse_inflight();

    let handles: Vec<_> = (0..5)
        .flat_map(|i| {
            let key = format!("key-{i}");
            (0..4).map(move |_| key.clone())
        })
        .map(|key| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(key).await })
        })
        .collect();

    for result in join_all(handles).await {
        assert_eq!(result.unwrap().unwrap(), None);
    }
    assert_eq!(backing.reads(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_waiter_sees_the_same_failure() {
    let backing = SlowCache::new(Duration::from_millis(50));
    backing.fail_reads(true);
    let cache = backing.clone().reuse_inflight();

    let results = join_all((0..8).map(|_| cache.get("k".into()))).await;
    let errors: Vec<_> = results.into_iter().map(|r| r.unwrap_err()).collect();

    let first = errors[0].cache_error().unwrap();
    for err in &errors[1..] {
        assert!(Arc::ptr_eq(first, err.cache_error().unwrap()));
    }
    assert_eq!(backing.reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_reaches_every_waiter() {
    let backing = SlowCache::new(Duration::from_millis(500));
    let cache = backing.clone().reuse_inflight();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("k".into()).await })
        })
        .collect();
    while cache.in_flight() == 0 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(cache.cancel_inflight(&"k".to_string()));
    for result in join_all(handles).await {
        assert!(result.unwrap().unwrap_err().is_cancelled());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn leader_and_joiner_events_add_up() {
    let led = Arc::new(AtomicUsize::new(0));
    let joined = Arc::new(AtomicUsize::new(0));
    let (l, j) = (Arc::clone(&led), Arc::clone(&joined));

    let config = ReuseInflightConfig::builder()
        .on_led(move || {
            l.fetch_add(1, Ordering::SeqCst);
        })
        .on_joined(move || {
            j.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let backing = SlowCache::new(Duration::from_millis(50));
    let cache = ReuseInflight::with_config(backing.clone(), config);

    join_all((0..12).map(|_| cache.get("k".into()))).await;

    assert_eq!(led.load(Ordering::SeqCst), backing.reads());
    assert_eq!(led.load(Ordering::SeqCst) + joined.load(Ordering::SeqCst), 12);
}
