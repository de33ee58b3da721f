//! splinesynth End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the launch-level guarantees:
//!
//! - **Fault isolation**: a faulted instance never disturbs its siblings
//! - **Determinism**: byte-identical output across runs and execution models
//! - **Hint invariance**: warm and cold spline lookups agree everywhere
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p splinesynth-tests
//!
//! # Property tests only
//! cargo test -p splinesynth-tests --test proptest_spline
//! ```

pub mod determinism;
pub mod fixtures;

pub use determinism::{compute_hash, verify_determinism, DeterminismResult};
pub use fixtures::{chirp_partial, quartic_spline, tone_batch, BatchDir};
