//! Configuration for the in-flight reuse wrapper.

use super::ReuseInflightEvent;
use layercache_core::{EventListeners, FnListener};

#[cfg(feature = "tracing")]
use layercache_core::LayerEvent;
#[cfg(feature = "tracing")]
use tracing::warn;

/// Configuration for [`ReuseInflight`](crate::ReuseInflight).
#[derive(Debug, Clone)]
pub struct ReuseInflightConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<ReuseInflightEvent>,
}

impl ReuseInflightConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ReuseInflightConfigBuilder {
        ReuseInflightConfigBuilder::new()
    }

    /// Returns the configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emits `event` to the configured listeners, logging any that panicked.
    pub(crate) fn emit(&self, event: &ReuseInflightEvent) {
        let panicked = self.event_listeners.emit(event);

        #[cfg(feature = "tracing")]
        if panicked > 0 {
            warn!(
                cache = %self.name,
                event = event.event_type(),
                panicked,
                "Event listener panicked"
            );
        }

        #[cfg(not(feature = "tracing"))]
        let _ = panicked;
    }
}

impl Default for ReuseInflightConfig {
    fn default() -> Self {
        ReuseInflightConfigBuilder::new().build()
    }
}

/// Builder for [`ReuseInflightConfig`].
#[derive(Debug)]
pub struct ReuseInflightConfigBuilder {
    name: String,
    event_listeners: EventListeners<ReuseInflightEvent>,
}

impl ReuseInflightConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a `get` starts a new fetch.
    pub fn on_led<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, ReuseInflightEvent::Led { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when a `get` joins a fetch in flight.
    pub fn on_joined<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, ReuseInflightEvent::Joined { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when a shared fetch is abandoned.
    ///
    /// The callback receives `true` if the fetch was cancelled and `false`
    /// if it failed.
    pub fn on_abandoned<F>(mut self, f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ReuseInflightEvent::Abandoned { cancelled, .. } = event {
                f(*cancelled);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ReuseInflightConfig {
        ReuseInflightConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for ReuseInflightConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
