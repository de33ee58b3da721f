//! splinesynth CLI library.
//!
//! Command implementations shared by the `splinesynth` binary and the
//! end-to-end tests.

pub mod commands;
