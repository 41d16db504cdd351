//! Async caches built on cancellable deferred tasks.
//!
//! This crate defines the [`Cache`] contract (get, set and evict by key) and
//! a few pieces that compose with it:
//!
//! - [`MapCache`]: an in-memory implementation
//! - [`ReuseInflight`]: shares one fetch among concurrent `get`s for a key
//!   and forgets fetches that are cancelled or fail
//! - [`CacheService`]: exposes `get` as a `tower` service
//!
//! The task handle and terminal-outcome observer used underneath are
//! re-exported from `layercache-deferred`.
//!
//! # Example
//!
//! ```rust
//! use layercache::{Cache, CacheExt, MapCache, ReuseInflightConfig, ReuseInflight};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backing = MapCache::new();
//! backing.set("config", 3).await.unwrap();
//!
//! let config = ReuseInflightConfig::builder()
//!     .name("settings")
//!     .on_abandoned(|cancelled| eprintln!("fetch abandoned (cancelled: {cancelled})"))
//!     .build();
//! let cache = ReuseInflight::with_config(backing, config);
//!
//! assert_eq!(cache.get("config").await.unwrap(), Some(3));
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `tracing`: log shared, joined and abandoned fetches
//! - `metrics`: `reuse_inflight_requests_total` and
//!   `reuse_inflight_abandoned_total`, plus the deferred task metrics

mod cache;
mod error;
mod map;
mod reuse_inflight;
mod service;

pub use cache::{Cache, CacheExt};
pub use error::ReuseInflightError;
pub use map::MapCache;
pub use reuse_inflight::{
    ReuseInflight, ReuseInflightConfig, ReuseInflightConfigBuilder, ReuseInflightEvent,
};
pub use service::CacheService;

pub use layercache_core::{EventListener, EventListeners, FnListener, LayerEvent};
pub use layercache_deferred::{
    on_cancel, CurrentRuntime, Deferred, DeferredBuilder, DeferredEvent, Executor, Outcome,
    TaskError, TaskState,
};
