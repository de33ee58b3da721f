//! Precision abstraction.
//!
//! Every algorithm in the kernel is generic over [`Real`], so the reduced
//! (`f32`) and full (`f64`) precision paths share one implementation and differ
//! only in rounding.

use std::fmt::{Debug, Display};

use num_traits::float::Float;
use splinesynth_spec::Precision;

/// Scalar type the kernel computes in.
pub trait Real: Float + Default + Debug + Display + Send + Sync + 'static {
    /// Precision this type implements.
    const PRECISION: Precision;

    /// Converts a host-side `f64`, rounding if needed.
    fn lit(v: f64) -> Self;

    /// Widens to `f64` for diagnostics and reports.
    fn widen(self) -> f64;

    /// Appends the little-endian bytes of this value.
    fn write_le(self, buf: &mut Vec<u8>);

    /// Converts a sample index.
    #[inline]
    fn from_index(j: usize) -> Self {
        Self::lit(j as f64)
    }
}

impl Real for f32 {
    const PRECISION: Precision = Precision::Reduced;

    #[inline(always)]
    fn lit(v: f64) -> Self {
        v as f32
    }

    #[inline(always)]
    fn widen(self) -> f64 {
        self as f64
    }

    fn write_le(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }
}

impl Real for f64 {
    const PRECISION: Precision = Precision::Full;

    #[inline(always)]
    fn lit(v: f64) -> Self {
        v
    }

    #[inline(always)]
    fn widen(self) -> f64 {
        self
    }

    fn write_le(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }
}

/// Precision selected at build time with the `reduced-precision` feature.
#[cfg(feature = "reduced-precision")]
pub type DefaultReal = f32;

/// Precision selected at build time with the `reduced-precision` feature.
#[cfg(not(feature = "reduced-precision"))]
pub type DefaultReal = f64;
