//! Terminal-outcome observer.

use crate::{Deferred, TaskError};

/// Calls `callback` once if `deferred` is cancelled or fails.
///
/// The callback receives [`TaskError::Cancelled`] on cancellation and the
/// task's own failure otherwise; a [`TaskError::Failed`] shares its `Arc`
/// with what [`Deferred::wait`] returns. On success the callback is dropped
/// without being called.
///
/// Registration returns immediately. The callback runs on whatever context
/// settles the task, or on a spawned task when `deferred` has already
/// settled, so it must not assume any ordering with other waiters. The
/// observed task is never cancelled or otherwise touched.
///
/// # Example
///
/// ```rust
/// use layercache_deferred::{on_cancel, Deferred};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = Deferred::spawn(async {
///     tokio::time::sleep(Duration::from_millis(500)).await;
///     Ok::<_, std::io::Error>(())
/// });
///
/// let (tx, rx) = tokio::sync::oneshot::channel();
/// on_cancel(&task, move |err| {
///     let _ = tx.send(err.is_cancelled());
/// });
///
/// task.cancel();
/// assert!(rx.await.unwrap());
/// # }
/// ```
pub fn on_cancel<T, E, F>(deferred: &Deferred<T, E>, callback: F)
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: FnOnce(TaskError<E>) + Send + 'static,
{
    deferred.invoke_on_completion(move |outcome| {
        if let Err(error) = outcome {
            callback(error.clone());
        }
    });
}
