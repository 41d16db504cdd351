//! The deferred task handle and its completion machinery.

use crate::{DeferredBuilder, DeferredEvent, Executor, TaskError, TaskState};
use layercache_core::EventListeners;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::AbortHandle;

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use layercache_core::LayerEvent;
#[cfg(feature = "tracing")]
use tracing::{debug, error, warn};

/// The terminal outcome of a deferred task.
pub type Outcome<T, E> = Result<T, TaskError<E>>;

type CompletionHandler<T, E> = Box<dyn FnOnce(&Outcome<T, E>) + Send>;

/// A cloneable handle to a spawned, cancellable unit of work.
///
/// The task is started as soon as it is created and settles exactly once
/// into [`TaskState::Succeeded`], [`TaskState::Cancelled`] or
/// [`TaskState::Failed`]. Any number of handles may wait for the outcome,
/// cancel the task, or register completion handlers. Dropping every handle
/// does not stop the task.
///
/// # Example
///
/// ```rust
/// use layercache_deferred::{Deferred, TaskState};
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = Deferred::spawn(async { Ok::<_, std::io::Error>("value") });
/// assert_eq!(task.wait().await.unwrap(), "value");
/// assert_eq!(task.state(), TaskState::Succeeded);
/// # }
/// ```
pub struct Deferred<T, E> {
    shared: Arc<Shared<T, E>>,
}

pub(crate) struct Shared<T, E> {
    name: String,
    slot: Mutex<Slot<T, E>>,
    state: watch::Sender<TaskState>,
    abort: Option<AbortHandle>,
    listeners: EventListeners<DeferredEvent>,
}

/// Outcome and pending handlers live under one lock, so a handler is either
/// queued before the outcome is published or sees the published outcome.
struct Slot<T, E> {
    outcome: Option<Arc<Outcome<T, E>>>,
    handlers: Vec<CompletionHandler<T, E>>,
}

impl<T, E> Deferred<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Spawns `future` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        DeferredBuilder::new().spawn(future)
    }

    /// Spawns `future` on the given executor.
    pub fn spawn_on<X, F>(executor: &X, future: F) -> Self
    where
        X: Executor,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        DeferredBuilder::new().spawn_on(executor, future)
    }

    /// Creates a handle that has already succeeded with `value`.
    pub fn completed(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Creates a handle that has already failed with `error`.
    pub fn failed(error: E) -> Self {
        Self::settled(Err(TaskError::Failed(Arc::new(error))))
    }

    /// Creates a handle that has already been cancelled.
    pub fn cancelled() -> Self {
        Self::settled(Err(TaskError::Cancelled))
    }

    fn settled(outcome: Outcome<T, E>) -> Self {
        let shared = Arc::new(Shared::new(
            String::from("<unnamed>"),
            EventListeners::new(),
            None,
        ));
        shared.complete(outcome);
        Self { shared }
    }

    pub(crate) fn launch<X, F>(
        executor: &X,
        future: F,
        name: String,
        listeners: EventListeners<DeferredEvent>,
    ) -> Self
    where
        X: Executor,
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let task = executor.spawn(future);
        let shared = Arc::new(Shared::new(name, listeners, Some(task.abort_handle())));

        #[cfg(feature = "tracing")]
        debug!(deferred = %shared.name, "Deferred task spawned");

        let guard = CompletionGuard {
            shared: Some(Arc::clone(&shared)),
        };
        // The driver is detached; it only reports the task's outcome.
        let _driver = executor.spawn(async move {
            let outcome = match task.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(TaskError::Failed(Arc::new(e))),
                Err(join) if join.is_cancelled() => Err(TaskError::Cancelled),
                Err(join) => Err(TaskError::Panicked(panic_message(join.into_panic()))),
            };
            guard.finish(outcome);
        });

        Self { shared }
    }

    /// Requests cancellation.
    ///
    /// Aborts the spawned future and, if the task is still pending, settles
    /// it as cancelled right away. Cancelling a settled task does nothing.
    /// Returns `true` if this call moved the task out of `Pending`.
    pub fn cancel(&self) -> bool {
        if let Some(abort) = &self.shared.abort {
            abort.abort();
        }
        self.shared.complete(Err(TaskError::Cancelled))
    }

    /// Registers a handler run once with the task's terminal outcome.
    ///
    /// Handlers registered while the task is pending run on the context that
    /// settles the task, in registration order, before [`join`](Self::join)
    /// and [`wait`](Self::wait) return. Handlers registered after the task
    /// settled are dispatched onto the runtime when one is available and run
    /// inline otherwise, including when a runtime that is shutting down
    /// drops the dispatched task. A panicking handler is caught and reported
    /// as [`DeferredEvent::HandlerPanicked`].
    pub fn invoke_on_completion<F>(&self, handler: F)
    where
        F: FnOnce(&Outcome<T, E>) + Send + 'static,
    {
        let outcome = {
            let mut slot = self.shared.slot.lock();
            match &slot.outcome {
                Some(outcome) => Arc::clone(outcome),
                None => {
                    slot.handlers.push(Box::new(handler));
                    return;
                }
            }
        };
        Shared::dispatch_late(&self.shared, Box::new(handler), outcome);
    }

    /// Registers `callback` to run once if the task is cancelled or fails.
    ///
    /// See [`on_cancel`](crate::on_cancel).
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce(TaskError<E>) + Send + 'static,
    {
        crate::on_cancel(self, callback)
    }
}

impl<T, E> Deferred<T, E> {
    /// Returns the current lifecycle state.
    pub fn state(&self) -> TaskState {
        match &self.shared.slot.lock().outcome {
            Some(outcome) => TaskState::of(&**outcome),
            None => TaskState::Pending,
        }
    }

    /// Returns `true` once the task has settled.
    pub fn is_completed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Returns `true` if the task settled as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Returns the task's name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns `true` if both handles refer to the same task.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Waits until the task settles, without reading its outcome.
    pub async fn join(&self) {
        let mut state = self.shared.state.subscribe();
        // The sender lives as long as `self.shared`, so this cannot close.
        let _ = state.wait_for(|s| s.is_terminal()).await;
    }
}

impl<T: Clone, E> Deferred<T, E> {
    /// Waits until the task settles and returns its outcome.
    ///
    /// Every caller observes the same outcome; failures share the task's
    /// error instance.
    pub async fn wait(&self) -> Outcome<T, E> {
        self.join().await;
        self.try_outcome().unwrap_or(Err(TaskError::Cancelled))
    }

    /// Returns the outcome if the task has settled.
    pub fn try_outcome(&self) -> Option<Outcome<T, E>> {
        let slot = self.shared.slot.lock();
        slot.outcome.as_deref().map(|outcome| match outcome {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(e.clone()),
        })
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E> Shared<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn new(
        name: String,
        listeners: EventListeners<DeferredEvent>,
        abort: Option<AbortHandle>,
    ) -> Self {
        let (state, _) = watch::channel(TaskState::Pending);
        Self {
            name,
            slot: Mutex::new(Slot {
                outcome: None,
                handlers: Vec::new(),
            }),
            state,
            abort,
            listeners,
        }
    }

    /// Publishes the first terminal outcome and runs the queued handlers.
    ///
    /// Later calls are ignored and return `false`.
    fn complete(&self, outcome: Outcome<T, E>) -> bool {
        let (outcome, handlers) = {
            let mut slot = self.slot.lock();
            if slot.outcome.is_some() {
                return false;
            }
            let outcome = Arc::new(outcome);
            slot.outcome = Some(Arc::clone(&outcome));
            (outcome, std::mem::take(&mut slot.handlers))
        };

        let state = TaskState::of(&*outcome);
        self.record(&outcome, state);

        for handler in handlers {
            self.run_handler(handler, &outcome);
        }
        // Joiners resume only after the queued handlers ran.
        self.state.send_replace(state);
        true
    }

    fn dispatch_late(
        this: &Arc<Self>,
        handler: CompletionHandler<T, E>,
        outcome: Arc<Outcome<T, E>>,
    ) {
        let delivery = LateDelivery {
            shared: Arc::clone(this),
            handler: Some(handler),
            outcome,
        };
        match tokio::runtime::Handle::try_current() {
            // A runtime that is shutting down drops the task unpolled, and
            // the delivery then runs from its destructor.
            Ok(runtime) => {
                runtime.spawn(async move { delivery.deliver() });
            }
            Err(_) => delivery.deliver(),
        }
    }

    fn run_handler(&self, handler: CompletionHandler<T, E>, outcome: &Outcome<T, E>) {
        if catch_unwind(AssertUnwindSafe(|| handler(outcome))).is_err() {
            #[cfg(feature = "tracing")]
            error!(deferred = %self.name, "Completion handler panicked");

            self.emit(&DeferredEvent::HandlerPanicked {
                source_name: self.name.clone(),
                timestamp: Instant::now(),
            });
        }
    }

    fn emit(&self, event: &DeferredEvent) {
        let panicked = self.listeners.emit(event);

        #[cfg(feature = "tracing")]
        if panicked > 0 {
            warn!(
                deferred = %self.name,
                event = event.event_type(),
                panicked,
                "Event listener panicked"
            );
        }

        #[cfg(not(feature = "tracing"))]
        let _ = panicked;
    }

    fn record(&self, outcome: &Outcome<T, E>, state: TaskState) {
        #[cfg(feature = "metrics")]
        counter!(
            "deferred_outcomes_total",
            "deferred" => self.name.clone(),
            "outcome" => state.as_str()
        )
        .increment(1);

        #[cfg(feature = "tracing")]
        debug!(deferred = %self.name, outcome = %state, "Deferred task settled");

        #[cfg(not(any(feature = "metrics", feature = "tracing")))]
        let _ = state;

        if self.listeners.is_empty() {
            return;
        }
        let source_name = self.name.clone();
        let timestamp = Instant::now();
        let event = match outcome {
            Ok(_) => DeferredEvent::Succeeded {
                source_name,
                timestamp,
            },
            Err(TaskError::Cancelled) => DeferredEvent::Cancelled {
                source_name,
                timestamp,
            },
            Err(e) => DeferredEvent::Failed {
                source_name,
                timestamp,
                panicked: e.is_panic(),
            },
        };
        self.emit(&event);
    }
}

/// A completion handler registered after the task settled.
///
/// The handler runs exactly once: when the delivery is invoked, or when it
/// is dropped without having been invoked.
struct LateDelivery<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    shared: Arc<Shared<T, E>>,
    handler: Option<CompletionHandler<T, E>>,
    outcome: Arc<Outcome<T, E>>,
}

impl<T, E> LateDelivery<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn deliver(mut self) {
        if let Some(handler) = self.handler.take() {
            self.shared.run_handler(handler, &self.outcome);
        }
    }
}

impl<T, E> Drop for LateDelivery<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            self.shared.run_handler(handler, &self.outcome);
        }
    }
}

/// Settles the task as cancelled if the driver is dropped before it could
/// report, e.g. when the runtime shuts down.
struct CompletionGuard<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    shared: Option<Arc<Shared<T, E>>>,
}

impl<T, E> CompletionGuard<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn finish(mut self, outcome: Outcome<T, E>) {
        if let Some(shared) = self.shared.take() {
            shared.complete(outcome);
        }
    }
}

impl<T, E> Drop for CompletionGuard<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Err(TaskError::Cancelled));
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> Arc<str> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Arc::from(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Arc::from(s.as_str())
    } else {
        Arc::from("<non-string panic payload>")
    }
}
