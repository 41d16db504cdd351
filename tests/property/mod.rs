//! Property-based tests for deferred tasks and in-flight reuse.
//!
//! Run with: cargo test --test property_tests

pub mod reuse_inflight;
