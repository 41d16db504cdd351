//! Cancellable deferred tasks with terminal-outcome observers.
//!
//! A [`Deferred`] is a cloneable handle to a spawned unit of work that
//! settles exactly once: it succeeds with a value, is cancelled, or fails.
//! Observers registered with [`on_cancel`] are told about the non-success
//! outcomes without taking part in the task's own result delivery.
//!
//! # Example
//!
//! ```rust
//! use layercache_deferred::{on_cancel, Deferred};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct LookupFailed;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let failures = Arc::new(AtomicUsize::new(0));
//! let f = Arc::clone(&failures);
//!
//! let task = Deferred::spawn(async { Err::<String, _>(LookupFailed) });
//! on_cancel(&task, move |err| {
//!     if err.is_failure() {
//!         f.fetch_add(1, Ordering::SeqCst);
//!     }
//! });
//!
//! // The primary awaiter still sees the failure itself.
//! assert!(task.wait().await.is_err());
//! # }
//! ```
//!
//! # Observer Semantics
//!
//! - The callback fires at most once, and only for cancellation or failure
//! - A failure is passed through untouched, sharing its `Arc` with awaiters
//! - Registering on a task that already settled is decided by its state:
//!   a cancelled or failed task still delivers, a succeeded one never does
//! - Every registration fires independently, in registration order
//! - A panicking callback is caught and reported as
//!   [`DeferredEvent::HandlerPanicked`]; it never reaches the task
//!
//! # Feature Flags
//!
//! - `tracing`: log task lifecycle transitions and handler panics
//! - `metrics`: count terminal outcomes as `deferred_outcomes_total`

mod builder;
mod deferred;
mod error;
mod events;
mod executor;
mod on_cancel;
mod state;

pub use builder::DeferredBuilder;
pub use deferred::{Deferred, Outcome};
pub use error::TaskError;
pub use events::DeferredEvent;
pub use executor::{CurrentRuntime, Executor};
pub use on_cancel::on_cancel;
pub use state::TaskState;
