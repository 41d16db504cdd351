//! Error types for deferred tasks.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a deferred task did not produce a value.
///
/// `Failed` keeps the task's own error behind an [`Arc`], so the primary
/// awaiter and every observer receive the very same instance.
#[derive(Error)]
pub enum TaskError<E> {
    /// The task was cancelled before it produced a value.
    #[error("task was cancelled")]
    Cancelled,

    /// The task's future resolved to an error.
    #[error("task failed: {0}")]
    Failed(Arc<E>),

    /// The task's future panicked.
    #[error("task panicked: {0}")]
    Panicked(Arc<str>),
}

impl<E> TaskError<E> {
    /// Returns `true` if this is the cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Returns `true` if the task failed, either with an error or a panic.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskError::Failed(_) | TaskError::Panicked(_))
    }

    /// Returns `true` if the task panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Returns the task's own error, if it failed with one.
    pub fn failure(&self) -> Option<&Arc<E>> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> Clone for TaskError<E> {
    fn clone(&self) -> Self {
        match self {
            TaskError::Cancelled => TaskError::Cancelled,
            TaskError::Failed(e) => TaskError::Failed(Arc::clone(e)),
            TaskError::Panicked(msg) => TaskError::Panicked(Arc::clone(msg)),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Cancelled => f.write_str("Cancelled"),
            TaskError::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            TaskError::Panicked(msg) => f.debug_tuple("Panicked").field(msg).finish(),
        }
    }
}
