//! Events emitted by deferred tasks.

use layercache_core::LayerEvent;
use std::time::Instant;

/// Events emitted when a deferred task settles.
#[derive(Debug, Clone)]
pub enum DeferredEvent {
    /// The task produced a value.
    Succeeded {
        /// Name of the task.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// The task was cancelled.
    Cancelled {
        /// Name of the task.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// The task failed.
    Failed {
        /// Name of the task.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Whether the failure was a panic.
        panicked: bool,
    },

    /// A completion handler panicked while being notified.
    HandlerPanicked {
        /// Name of the task.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
}

impl LayerEvent for DeferredEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Cancelled { .. } => "cancelled",
            Self::Failed { .. } => "failed",
            Self::HandlerPanicked { .. } => "handler_panicked",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Succeeded { timestamp, .. }
            | Self::Cancelled { timestamp, .. }
            | Self::Failed { timestamp, .. }
            | Self::HandlerPanicked { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            Self::Succeeded { source_name, .. }
            | Self::Cancelled { source_name, .. }
            | Self::Failed { source_name, .. }
            | Self::HandlerPanicked { source_name, .. } => source_name,
        }
    }
}
