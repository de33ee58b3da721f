//! Flattened invocation layout.
//!
//! A [`FlatBatch`] is what a driver hands to [`crate::dispatch::launch`]: all
//! knots in one array, all coefficients in another, and small headers that
//! address into them by offset. Headers are untrusted; every offset is bounds
//! checked before use and a bad one faults only its own instance.
//!
//! [`BatchOutput`] is what comes back: the flat sample buffer, one
//! [`ErrorRecord`] per instance, and the output region each instance owned.

use std::ops::Range;

use splinesynth_spec::{ErrorRecord, FN_OSCILLATOR};

use crate::real::Real;

/// Location of one spline inside a [`FlatBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplineHeader {
    /// Offset of the first knot in [`FlatBatch::knots`].
    pub knot_offset: usize,
    /// Number of knots.
    pub n_knots: usize,
    /// Offset of the first coefficient in [`FlatBatch::coeffs`].
    pub coeff_offset: usize,
    /// Number of coefficients.
    pub n_coeffs: usize,
    /// Polynomial order.
    pub order: usize,
}

impl SplineHeader {
    /// Source range of the knots, if it does not overflow.
    pub fn knot_range(&self) -> Option<Range<usize>> {
        Some(self.knot_offset..self.knot_offset.checked_add(self.n_knots)?)
    }

    /// Source range of the coefficients, if it does not overflow.
    pub fn coeff_range(&self) -> Option<Range<usize>> {
        Some(self.coeff_offset..self.coeff_offset.checked_add(self.n_coeffs)?)
    }
}

/// One partial: two splines and the integration start phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialHeader<R> {
    /// Phase (or angular frequency) spline.
    pub phase: SplineHeader,
    /// Amplitude spline.
    pub amplitude: SplineHeader,
    /// Phase at the first knot; read only by integrated phase.
    pub phase_offset: R,
}

/// Per-instance parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceHeader<R> {
    /// Time origin.
    pub t0: R,
    /// Sample interval.
    pub dt: R,
    /// First sample index (inclusive).
    pub j1: usize,
    /// Last sample index (exclusive).
    pub j2: usize,
    /// Index of the first partial in [`FlatBatch::partials`].
    pub first_partial: usize,
    /// Number of partials.
    pub n_partials: usize,
    /// Start of this instance's region in the output buffer.
    pub output_offset: usize,
}

impl<R> InstanceHeader<R> {
    /// Samples this instance writes; zero when the range is inverted.
    pub fn sample_count(&self) -> usize {
        self.j2.saturating_sub(self.j1)
    }

    /// Output region, if it does not overflow.
    pub fn output_range(&self) -> Option<Range<usize>> {
        Some(self.output_offset..self.output_offset.checked_add(self.sample_count())?)
    }
}

/// A batch in flattened form.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBatch<R> {
    /// Synthesis function id.
    pub function: u32,
    /// Every spline's knots, back to back.
    pub knots: Vec<R>,
    /// Every spline's coefficients, back to back.
    pub coeffs: Vec<R>,
    /// Every instance's partials, back to back.
    pub partials: Vec<PartialHeader<R>>,
    /// Instance headers.
    pub instances: Vec<InstanceHeader<R>>,
    /// Length of the output buffer.
    pub output_len: usize,
}

impl<R: Real> Default for FlatBatch<R> {
    fn default() -> Self {
        Self::new(FN_OSCILLATOR)
    }
}

impl<R: Real> FlatBatch<R> {
    /// An empty batch for `function`.
    pub fn new(function: u32) -> Self {
        Self {
            function,
            knots: Vec::new(),
            coeffs: Vec::new(),
            partials: Vec::new(),
            instances: Vec::new(),
            output_len: 0,
        }
    }

    /// Appends a spline's arrays and returns its header.
    pub fn push_spline(&mut self, knots: &[f64], coeffs: &[f64], order: usize) -> SplineHeader {
        let header = SplineHeader {
            knot_offset: self.knots.len(),
            n_knots: knots.len(),
            coeff_offset: self.coeffs.len(),
            n_coeffs: coeffs.len(),
            order,
        };
        self.knots.extend(knots.iter().map(|&k| R::lit(k)));
        self.coeffs.extend(coeffs.iter().map(|&c| R::lit(c)));
        header
    }

    /// Appends an instance whose output region follows the previous one.
    ///
    /// Returns the instance index.
    pub fn push_instance(
        &mut self,
        t0: f64,
        dt: f64,
        j1: usize,
        j2: usize,
        partials: impl IntoIterator<Item = PartialHeader<R>>,
    ) -> usize {
        let first_partial = self.partials.len();
        self.partials.extend(partials);
        let header = InstanceHeader {
            t0: R::lit(t0),
            dt: R::lit(dt),
            j1,
            j2,
            first_partial,
            n_partials: self.partials.len() - first_partial,
            output_offset: self.output_len,
        };
        self.output_len = self.output_len.saturating_add(header.sample_count());
        self.instances.push(header);
        self.instances.len() - 1
    }

    /// Source knots of a spline, or `None` if the header points outside the batch.
    pub fn spline_knots(&self, header: &SplineHeader) -> Option<&[R]> {
        self.knots.get(header.knot_range()?)
    }

    /// Source coefficients of a spline, or `None` if the header points outside the batch.
    pub fn spline_coeffs(&self, header: &SplineHeader) -> Option<&[R]> {
        self.coeffs.get(header.coeff_range()?)
    }
}

/// Everything a launch produces.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput<R> {
    /// Flat sample buffer, [`FlatBatch::output_len`] long.
    pub samples: Vec<R>,
    /// One record per instance.
    pub errors: Vec<ErrorRecord>,
    /// Region each instance wrote, or `None` if it was refused one.
    pub regions: Vec<Option<Range<usize>>>,
}

impl<R: Real> BatchOutput<R> {
    /// Samples of instance `i`.
    pub fn instance_samples(&self, i: usize) -> Option<&[R]> {
        let range = self.regions.get(i)?.clone()?;
        self.samples.get(range)
    }

    /// Error record of instance `i`.
    pub fn error(&self, i: usize) -> Option<&ErrorRecord> {
        self.errors.get(i)
    }

    /// Indices of instances that reported a fault.
    pub fn failed_instances(&self) -> Vec<usize> {
        self.errors
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_fault())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns true if no instance faulted.
    pub fn all_ok(&self) -> bool {
        self.errors.iter().all(|e| !e.is_fault())
    }

    /// Little-endian bytes of the sample buffer at its native precision.
    pub fn pcm_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * std::mem::size_of::<R>());
        for &s in &self.samples {
            s.write_le(&mut bytes);
        }
        bytes
    }

    /// BLAKE3 hash of [`Self::pcm_bytes`], as hex.
    pub fn pcm_hash(&self) -> String {
        blake3::hash(&self.pcm_bytes()).to_hex().to_string()
    }
}
