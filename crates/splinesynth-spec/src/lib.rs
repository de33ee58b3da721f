//! splinesynth batch description library
//!
//! This crate provides the host-facing types for spline-driven additive
//! synthesis batches: owned splines, partials, instances and batches, the
//! compiled-in size limits, the per-instance fault taxonomy, and validation.
//!
//! # Example
//!
//! ```
//! use splinesynth_spec::{validate_batch, BatchSpec, InstanceSpec, PartialSpec, SplineSpec};
//!
//! let partial = PartialSpec::steady(440.0, SplineSpec::constant(0.5, 0.0, 1.0), 1.0);
//! let batch = BatchSpec::new(vec![InstanceSpec::at_rate(44_100, 1.0, vec![partial])]);
//!
//! assert!(validate_batch(&batch).is_ok());
//! assert_eq!(batch.total_samples(), 44_100);
//! ```
//!
//! # Modules
//!
//! - [`batch`]: Partials, instances and batches
//! - [`config`]: Kernel configuration (phase mode, extrapolation, execution model)
//! - [`error`]: Fault codes, error records and validation errors
//! - [`instrument`]: Ready-made spectra and envelopes
//! - [`limits`]: Compiled-in maxima and the size-limit query
//! - [`spline`]: Owned splines and reshaping utilities
//! - [`validation`]: Host-side checks against the limits

pub mod batch;
pub mod config;
pub mod error;
pub mod instrument;
pub mod limits;
pub mod spline;
pub mod validation;

pub use batch::{BatchSpec, InstanceSpec, PartialSpec, DEFAULT_SAMPLE_RATE, FN_OSCILLATOR};
pub use config::{Extrapolation, ExecutionModel, KernelConfig, PhaseMode, Precision};
pub use error::{ErrorRecord, FaultCode, FaultDetail, Location, ValidationError, ValidationResult};
pub use limits::{
    max_size, LimitQuery, SizeLimits, AMP_SPLINE_ORDER, MAX_INSTANCES, MAX_PARTIALS,
    MAX_SPLINE_COEFFS, MAX_SPLINE_KNOTS, PHASE_SPLINE_ORDER,
};
pub use spline::{SplineShapeError, SplineSpec};
pub use validation::{validate_batch, validate_spline};
