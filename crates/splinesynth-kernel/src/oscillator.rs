//! Oscillator synthesis engine.
//!
//! For each sample `j` the engine evaluates every active partial's phase and
//! amplitude splines at `t = t0 + j * dt` and writes
//! `sum(amplitude * cos(phase))`. Each partial keeps its own pair of search
//! hints, so a monotonic sweep costs O(1) per evaluation.
//!
//! Faults degrade output, they never stop it: a partial whose evaluation fails
//! contributes nothing to that sample, and a non-finite sum is written as zero.

use splinesynth_spec::{Extrapolation, FaultCode, FaultDetail, Location, MAX_PARTIALS};

use crate::fault::ErrorSlot;
use crate::real::Real;
use crate::spline::{evaluate, SearchHint};
use crate::staging::StagedInstance;

/// Time base of one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceParams<R> {
    /// Time origin.
    pub t0: R,
    /// Sample interval.
    pub dt: R,
}

impl<R: Real> InstanceParams<R> {
    /// Time of sample `j`.
    #[inline]
    pub fn time_at(&self, j: usize) -> R {
        self.t0 + R::from_index(j) * self.dt
    }
}

/// Synthesizes samples `j_start..j_start + out.len()` into `out`.
///
/// Hints start cold, so a worker handed any chunk of an instance's range
/// produces the same samples a single worker would.
pub fn synthesize<R: Real>(
    staged: &StagedInstance<'_, R>,
    params: &InstanceParams<R>,
    j_start: usize,
    out: &mut [R],
    slot: &mut ErrorSlot<'_>,
    policy: Extrapolation,
) {
    let n_partials = staged.n_partials().min(MAX_PARTIALS);
    let mut phase_hints = [SearchHint::cold(); MAX_PARTIALS];
    let mut amp_hints = [SearchHint::cold(); MAX_PARTIALS];

    for (offset, y) in out.iter_mut().enumerate() {
        let j = j_start + offset;
        let t = params.time_at(j);
        if !t.is_finite() {
            slot.report(FaultCode::Nan, Location::Oscillator, FaultDetail::at(j as i64, t.widen()));
            *y = R::zero();
            continue;
        }

        let mut sum = R::zero();
        for p in 0..n_partials {
            let Some((phase_spline, amp_spline)) = staged.partial(p) else {
                continue;
            };
            let phase = match evaluate(phase_spline, t, &mut phase_hints[p], policy) {
                Ok(v) => v,
                Err(fault) => {
                    slot.report_spline(fault, Location::PhaseSpline, p, j);
                    continue;
                }
            };
            let amplitude = match evaluate(amp_spline, t, &mut amp_hints[p], policy) {
                Ok(v) => v,
                Err(fault) => {
                    slot.report_spline(fault, Location::AmplitudeSpline, p, j);
                    continue;
                }
            };
            sum = sum + amplitude * phase.cos();
        }

        if sum.is_finite() {
            *y = sum;
        } else {
            slot.report(FaultCode::Nan, Location::Oscillator, FaultDetail::at(j as i64, sum.widen()));
            *y = R::zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{FlatBatch, PartialHeader};
    use crate::staging::{Scratch, StagingArea};
    use splinesynth_spec::{ErrorRecord, PhaseMode};

    const RATE: f64 = 8_192.0;
    const OMEGA: f64 = std::f64::consts::TAU * 440.0;

    fn render(
        batch: &FlatBatch<f64>,
        partials: &[PartialHeader<f64>],
        mode: PhaseMode,
        policy: Extrapolation,
        j_start: usize,
        len: usize,
    ) -> (Vec<f64>, ErrorRecord) {
        let mut scratch = Scratch::new();
        let mut record = ErrorRecord::CLEAR;
        let mut out = vec![0.0; len];
        {
            let mut slot = ErrorSlot::new(&mut record);
            let mut area = StagingArea::new(&mut scratch, batch, partials, mode, &mut slot);
            area.copy_cooperative(1);
            let staged = area.seal(&mut slot);
            let params = InstanceParams { t0: 0.0, dt: 1.0 / RATE };
            synthesize(&staged, &params, j_start, &mut out, &mut slot, policy);
        }
        (out, record)
    }

    fn constant_partial(batch: &mut FlatBatch<f64>, amplitude: f64) -> PartialHeader<f64> {
        PartialHeader {
            phase: batch.push_spline(&[0.0, 1.0], &[OMEGA, 0.0], 1),
            amplitude: batch.push_spline(&[0.0, 1.0], &[amplitude], 0),
            phase_offset: 0.0,
        }
    }

    #[test]
    fn test_constant_partial_is_cosine() {
        let mut batch = FlatBatch::default();
        let p = constant_partial(&mut batch, 1.0);
        let (out, record) = render(&batch, &[p], PhaseMode::Direct, Extrapolation::Extrapolate, 0, 4_000);

        assert!(!record.is_fault());
        for (j, y) in out.iter().enumerate() {
            let expected = (OMEGA * j as f64 / RATE).cos();
            assert!((y - expected).abs() < 1e-9, "j={} y={} expected={}", j, y, expected);
        }
    }

    #[test]
    fn test_partials_sum_with_amplitude() {
        let mut batch = FlatBatch::default();
        let a = constant_partial(&mut batch, 0.25);
        let b = constant_partial(&mut batch, 0.5);
        let (out, _) = render(&batch, &[a, b], PhaseMode::Direct, Extrapolation::Extrapolate, 0, 64);
        for (j, y) in out.iter().enumerate() {
            let expected = 0.75 * (OMEGA * j as f64 / RATE).cos();
            assert!((y - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_integrated_matches_direct_for_constant_omega() {
        let mut batch = FlatBatch::default();
        let direct = constant_partial(&mut batch, 1.0);
        let integrated = PartialHeader {
            phase: batch.push_spline(&[0.0, 1.0], &[OMEGA], 0),
            ..direct
        };

        let (a, _) = render(&batch, &[direct], PhaseMode::Direct, Extrapolation::Extrapolate, 0, 2_000);
        let (b, rb) = render(&batch, &[integrated], PhaseMode::IntegratedOmega, Extrapolation::Extrapolate, 0, 2_000);
        assert!(!rb.is_fault());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_chunk_matches_full_range() {
        let mut batch = FlatBatch::default();
        let p = constant_partial(&mut batch, 1.0);
        let (full, _) = render(&batch, &[p], PhaseMode::Direct, Extrapolation::Extrapolate, 0, 300);
        let (tail, _) = render(&batch, &[p], PhaseMode::Direct, Extrapolation::Extrapolate, 120, 180);
        assert_eq!(&full[120..], &tail[..]);
    }

    #[test]
    fn test_nan_amplitude_skips_partial() {
        let mut batch = FlatBatch::default();
        let good = constant_partial(&mut batch, 1.0);
        let bad = PartialHeader {
            amplitude: batch.push_spline(&[0.0, 0.5, 1.0], &[1.0, f64::NAN], 0),
            ..good
        };
        let (out, record) = render(&batch, &[good, bad], PhaseMode::Direct, Extrapolation::Extrapolate, 0, 8_192);

        assert_eq!(record.fault(), Some(FaultCode::Nan));
        assert_eq!(record.location, Location::AmplitudeSpline.tag());
        assert_eq!(record.detail.partial, Some(1));
        assert_eq!(record.detail.index, 4_096);
        // Before the NaN segment both partials sound; after it only the good one.
        assert!((out[0] - 2.0).abs() < 1e-9);
        assert!((out[4_096] - (OMEGA * 0.5).cos()).abs() < 1e-9);
    }

    #[test]
    fn test_rejected_queries_write_silence() {
        let mut batch = FlatBatch::default();
        let p = constant_partial(&mut batch, 1.0);
        let (out, record) = render(&batch, &[p], PhaseMode::Direct, Extrapolation::Reject, 8_180, 20);

        assert_eq!(record.fault(), Some(FaultCode::IndexOutOfRange));
        assert_eq!(record.location, Location::PhaseSpline.tag());
        // t = 1 is the closing knot and still inside the domain.
        assert_eq!(record.detail.index, 8_193);
        assert!(out[13..].iter().all(|&y| y == 0.0));
        assert!(out[..13].iter().any(|&y| y != 0.0));
    }

    #[test]
    fn test_reduced_precision_tracks_full() {
        let mut full = FlatBatch::<f64>::default();
        let mut reduced = FlatBatch::<f32>::default();
        let phase = (&[0.0, 1.0][..], &[OMEGA, 0.0][..]);
        let pf = PartialHeader {
            phase: full.push_spline(phase.0, phase.1, 1),
            amplitude: full.push_spline(&[0.0, 1.0], &[0.5], 0),
            phase_offset: 0.0,
        };
        let pr = PartialHeader {
            phase: reduced.push_spline(phase.0, phase.1, 1),
            amplitude: reduced.push_spline(&[0.0, 1.0], &[0.5], 0),
            phase_offset: 0.0,
        };

        let (a, _) = render(&full, &[pf], PhaseMode::Direct, Extrapolation::Extrapolate, 0, 256);

        let mut scratch = Scratch::new();
        let mut record = ErrorRecord::CLEAR;
        let mut b = vec![0.0f32; 256];
        let mut slot = ErrorSlot::new(&mut record);
        let mut area = StagingArea::new(&mut scratch, &reduced, &[pr], PhaseMode::Direct, &mut slot);
        area.copy_cooperative(1);
        let staged = area.seal(&mut slot);
        let params = InstanceParams { t0: 0.0f32, dt: (1.0 / RATE) as f32 };
        synthesize(&staged, &params, 0, &mut b, &mut slot, Extrapolation::Extrapolate);

        for (x, y) in a.iter().zip(&b) {
            assert!((x - y.widen()).abs() < 1e-3);
        }
    }
}
