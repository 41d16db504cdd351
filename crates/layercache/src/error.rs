//! Error types for cache wrappers.

use layercache_deferred::TaskError;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by [`ReuseInflight`](crate::ReuseInflight).
#[derive(Debug, Error)]
pub enum ReuseInflightError<E> {
    /// The wrapped cache returned an error.
    ///
    /// Every caller that shared the fetch receives the same instance.
    #[error("cache error: {0}")]
    Cache(Arc<E>),

    /// The shared fetch was cancelled before it produced a value.
    #[error("in-flight fetch was cancelled")]
    Cancelled,

    /// The shared fetch panicked.
    #[error("in-flight fetch panicked: {0}")]
    Panicked(Arc<str>),
}

impl<E> ReuseInflightError<E> {
    /// Returns `true` if the shared fetch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReuseInflightError::Cancelled)
    }

    /// Returns the wrapped cache's error, if that is what failed.
    pub fn cache_error(&self) -> Option<&Arc<E>> {
        match self {
            ReuseInflightError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<TaskError<E>> for ReuseInflightError<E> {
    fn from(err: TaskError<E>) -> Self {
        match err {
            TaskError::Cancelled => ReuseInflightError::Cancelled,
            TaskError::Failed(e) => ReuseInflightError::Cache(e),
            TaskError::Panicked(msg) => ReuseInflightError::Panicked(msg),
        }
    }
}

impl<E> Clone for ReuseInflightError<E> {
    fn clone(&self) -> Self {
        match self {
            ReuseInflightError::Cache(e) => ReuseInflightError::Cache(Arc::clone(e)),
            ReuseInflightError::Cancelled => ReuseInflightError::Cancelled,
            ReuseInflightError::Panicked(msg) => ReuseInflightError::Panicked(Arc::clone(msg)),
        }
    }
}
