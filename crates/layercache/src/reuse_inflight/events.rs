//! Events emitted by the in-flight reuse wrapper.

use layercache_core::LayerEvent;
use std::time::Instant;

/// Events emitted by [`ReuseInflight`](crate::ReuseInflight).
#[derive(Debug, Clone)]
pub enum ReuseInflightEvent {
    /// A `get` started a new fetch.
    Led {
        /// Name of the wrapper instance.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A `get` joined a fetch already in flight.
    Joined {
        /// Name of the wrapper instance.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },

    /// A shared fetch was cancelled or failed and has been forgotten.
    Abandoned {
        /// Name of the wrapper instance.
        source_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// `true` for cancellation, `false` for failure.
        cancelled: bool,
    },
}

impl LayerEvent for ReuseInflightEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Led { .. } => "led",
            Self::Joined { .. } => "joined",
            Self::Abandoned { .. } => "abandoned",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::Led { timestamp, .. }
            | Self::Joined { timestamp, .. }
            | Self::Abandoned { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            Self::Led { source_name, .. }
            | Self::Joined { source_name, .. }
            | Self::Abandoned { source_name, .. } => source_name,
        }
    }
}
