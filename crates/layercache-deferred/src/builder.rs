//! Builder for named deferred tasks.

use crate::{CurrentRuntime, Deferred, DeferredEvent, Executor};
use layercache_core::{EventListener, EventListeners, FnListener};
use std::future::Future;

/// Builder for configuring and spawning a [`Deferred`].
///
/// The builder is not generic over the task's value or error type; those
/// are inferred from the future passed to [`spawn`](Self::spawn).
///
/// # Example
///
/// ```rust
/// use layercache_deferred::DeferredBuilder;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = DeferredBuilder::new()
///     .name("refresh-user")
///     .on_cancelled(|| eprintln!("refresh cancelled"))
///     .spawn(async { Ok::<_, std::io::Error>(42) });
///
/// assert_eq!(task.name(), "refresh-user");
/// # }
/// ```
#[derive(Debug)]
pub struct DeferredBuilder {
    name: String,
    listeners: EventListeners<DeferredEvent>,
}

impl DeferredBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            listeners: EventListeners::new(),
        }
    }

    /// Sets the name used in events, logs and metrics.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when the task succeeds.
    pub fn on_succeeded<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if matches!(event, DeferredEvent::Succeeded { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when the task is cancelled.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if matches!(event, DeferredEvent::Cancelled { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when the task fails.
    ///
    /// The callback receives `true` if the failure was a panic.
    pub fn on_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let DeferredEvent::Failed { panicked, .. } = event {
                f(*panicked);
            }
        }));
        self
    }

    /// Registers a listener for every event the task emits.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<DeferredEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Spawns `future` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime.
    pub fn spawn<T, E, F>(self, future: F) -> Deferred<T, E>
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.spawn_on(&CurrentRuntime::new(), future)
    }

    /// Spawns `future` on the given executor.
    pub fn spawn_on<T, E, X, F>(self, executor: &X, future: F) -> Deferred<T, E>
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
        X: Executor,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Deferred::launch(executor, future, self.name, self.listeners)
    }
}

impl Default for DeferredBuilder {
    fn default() -> Self {
        Self::new()
    }
}
