//! Executor trait for spawning deferred work.

use std::future::Future;
use tokio::task::JoinHandle;

/// Trait for executors that can spawn futures.
///
/// A [`Deferred`](crate::Deferred) spawns both its own future and the driver
/// that publishes the terminal outcome through this trait, so tasks can be
/// placed on a dedicated runtime instead of the ambient one.
///
/// # Example
///
/// ```rust,no_run
/// use layercache_deferred::{Deferred, Executor};
/// use tokio::runtime::Handle;
///
/// # async fn example() {
/// let handle = Handle::current();
/// let task = Deferred::spawn_on(&handle, async { Ok::<_, std::io::Error>(1) });
/// # }
/// ```
pub trait Executor: Clone + Send + Sync + 'static {
    /// Spawns a future onto this executor.
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

impl Executor for tokio::runtime::Handle {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::runtime::Handle::spawn(self, future)
    }
}

/// An executor that spawns on the runtime current at construction time.
#[derive(Clone, Debug)]
pub struct CurrentRuntime {
    handle: tokio::runtime::Handle,
}

impl CurrentRuntime {
    /// Captures the current runtime handle.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime.
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Returns the captured runtime handle.
    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

impl Default for CurrentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for CurrentRuntime {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}
