//! Lifecycle state of a deferred task.

use crate::TaskError;
use std::fmt;

/// Where a deferred task is in its lifecycle.
///
/// `Pending` is the only non-terminal state. Once a task leaves it, the
/// state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The task has not produced an outcome yet.
    Pending,
    /// The task produced a value.
    Succeeded,
    /// The task was cancelled.
    Cancelled,
    /// The task failed with an error or a panic.
    Failed,
}

impl TaskState {
    pub(crate) fn of<T, E>(outcome: &Result<T, TaskError<E>>) -> Self {
        match outcome {
            Ok(_) => TaskState::Succeeded,
            Err(TaskError::Cancelled) => TaskState::Cancelled,
            Err(_) => TaskState::Failed,
        }
    }

    /// Returns `true` for every state except `Pending`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Pending)
    }

    /// Returns the lowercase label used in events and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Succeeded => "succeeded",
            TaskState::Cancelled => "cancelled",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
