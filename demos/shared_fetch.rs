//! Concurrent gets sharing one backing read
//! Run with: cargo run --example shared_fetch
//! With tracing: RUST_LOG=debug cargo run --example shared_fetch --features tracing

use futures::future::join_all;
use layercache::{Cache, MapCache, ReuseInflight, ReuseInflightConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let backing = MapCache::new();
    backing.set("user:42", "Ada Lovelace").await.unwrap();

    let config = ReuseInflightConfig::builder()
        .name("users")
        .on_led(|| println!("started a fetch"))
        .on_joined(|| println!("joined a fetch in flight"))
        .on_abandoned(|cancelled| println!("fetch abandoned (cancelled: {cancelled})"))
        .build();
    let cache = ReuseInflight::with_config(backing, config);

    // Five gets for the same key resolve from a single read
    let results = join_all((0..5).map(|_| cache.get("user:42"))).await;
    for result in results {
        println!("got {:?}", result);
    }

    println!("in flight afterwards: {}", cache.in_flight());
}
