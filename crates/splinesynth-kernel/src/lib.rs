//! splinesynth kernel
//!
//! Batched additive synthesis where every partial's phase and amplitude follow
//! piecewise-polynomial splines.
//!
//! # Overview
//!
//! A launch takes a flattened batch of independent instances (notes, voices)
//! and renders each into its own region of one output buffer:
//!
//! - **Staging** copies an instance's splines into worker-owned scratch, then
//!   seals them read-only
//! - **Synthesis** evaluates `sum(amplitude(t) * cos(phase(t)))` per sample,
//!   with a per-partial search hint that makes forward sweeps O(1)
//! - **Faults** are recorded per instance, first fault wins, and never stop the
//!   launch or touch a sibling instance
//!
//! # Determinism
//!
//! A launch is a pure function of its inputs. Instance scheduling, the number
//! of rayon threads, and the execution model (one worker or a group of workers
//! per instance) do not change a single output bit.
//!
//! # Precision
//!
//! Everything is generic over [`Real`], implemented for `f32` and `f64`.
//! [`DefaultReal`] is `f64` unless the `reduced-precision` feature is enabled;
//! the CLI renders at `DefaultReal` when no precision is requested.
//!
//! # Example
//!
//! ```
//! use splinesynth_kernel::render;
//! use splinesynth_spec::{BatchSpec, InstanceSpec, PartialSpec, SplineSpec};
//!
//! let partial = PartialSpec::steady(440.0, SplineSpec::constant(0.5, 0.0, 0.1), 0.1);
//! let batch = BatchSpec::new(vec![InstanceSpec::at_rate(44_100, 0.1, vec![partial])]);
//!
//! let output = render::<f32>(&batch);
//! assert!(output.all_ok());
//! assert_eq!(output.samples.len(), 4_410);
//! ```
//!
//! # Crate Structure
//!
//! - [`abi`] - Flattened launch layout and launch output
//! - [`dispatch`] - Parallel launch over instances
//! - [`driver`] - Flattening, rendering and mixdown
//! - [`fault`] - Per-instance error sink
//! - [`oscillator`] - Partial accumulation
//! - [`real`] - Precision abstraction
//! - [`spline`] - Spline evaluator with search hints
//! - [`staging`] - Scratch staging and the staging barrier
//! - [`wav`] - Float WAV output

pub mod abi;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod fault;
pub mod oscillator;
pub mod real;
pub mod spline;
pub mod staging;
pub mod wav;

pub use abi::{BatchOutput, FlatBatch, InstanceHeader, PartialHeader, SplineHeader};
pub use dispatch::launch;
pub use driver::{flatten, mixdown, render, render_checked, MAX_MIX_SAMPLES};
pub use error::{KernelError, KernelResult};
pub use fault::ErrorSlot;
pub use real::{DefaultReal, Real};
pub use spline::{evaluate, SearchHint, SplineFault, SplineRef};
