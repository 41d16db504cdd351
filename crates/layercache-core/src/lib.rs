//! Core infrastructure for layercache.
//!
//! This crate provides the event system shared by the deferred task handle
//! and the cache wrappers:
//! - [`LayerEvent`] implemented by every event type
//! - [`EventListeners`] for fan-out with panic isolation
//! - [`FnListener`] to register closures as listeners

pub mod events;

pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, LayerEvent};
