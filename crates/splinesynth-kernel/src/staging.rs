//! Memory staging loader.
//!
//! Before an instance is evaluated its splines are copied out of the batch's
//! shared arrays into a [`Scratch`] buffer owned by the worker (or worker
//! group) processing it. Staging has two phases:
//!
//! 1. [`StagingArea::new`] checks every spline header against the limits and
//!    the batch bounds and plans where each spline lands in scratch.
//! 2. [`StagingArea::copy_cooperative`] copies the planned runs, optionally
//!    split across several workers.
//!
//! [`StagingArea::seal`] is the barrier between staging and evaluation. It
//! consumes the writable area, verifies that every planned element landed,
//! applies the integrated-phase transform if configured, and hands back a
//! read-only [`StagedInstance`]. The borrow checker then forbids any further
//! write to scratch until the staged instance is dropped.

use rayon::prelude::*;
use splinesynth_spec::{
    FaultCode, FaultDetail, Location, PhaseMode, AMP_SPLINE_ORDER, MAX_PARTIALS,
    MAX_SPLINE_COEFFS, MAX_SPLINE_KNOTS, PHASE_SPLINE_ORDER,
};
use tracing::warn;

use crate::abi::{FlatBatch, PartialHeader, SplineHeader};
use crate::fault::ErrorSlot;
use crate::real::Real;
use crate::spline::SplineRef;

/// Worker-owned scratch storage, reused across the instances a worker processes.
#[derive(Debug)]
pub struct Scratch<R> {
    knots: Vec<R>,
    coeffs: Vec<R>,
    knot_runs: Vec<CopyRun>,
    coeff_runs: Vec<CopyRun>,
}

impl<R: Real> Default for Scratch<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Real> Scratch<R> {
    /// Empty scratch. Buffers grow on first use and are kept afterwards.
    pub fn new() -> Self {
        Self {
            knots: Vec::new(),
            coeffs: Vec::new(),
            knot_runs: Vec::new(),
            coeff_runs: Vec::new(),
        }
    }

    /// Scratch pre-sized for the largest instance the limits allow.
    pub fn with_max_capacity() -> Self {
        let splines = 2 * MAX_PARTIALS;
        Self {
            knots: Vec::with_capacity(splines * MAX_SPLINE_KNOTS),
            coeffs: Vec::with_capacity(splines * MAX_SPLINE_COEFFS),
            knot_runs: Vec::with_capacity(splines),
            coeff_runs: Vec::with_capacity(splines),
        }
    }
}

/// One contiguous copy from the batch into scratch.
#[derive(Debug, Clone, Copy)]
struct CopyRun {
    src: usize,
    dst: usize,
    len: usize,
}

/// Where one spline lives in scratch.
#[derive(Debug, Clone, Copy)]
struct StagedSpline {
    knot_start: usize,
    n_knots: usize,
    coeff_start: usize,
    n_coeffs: usize,
    order: usize,
}

#[derive(Debug, Clone, Copy)]
struct StagedPartial<R> {
    phase: StagedSpline,
    amplitude: StagedSpline,
    phase_offset: R,
}

/// Writable staging state for one instance.
pub struct StagingArea<'s, 'b, R> {
    scratch: &'s mut Scratch<R>,
    source: &'b FlatBatch<R>,
    partials: [Option<StagedPartial<R>>; MAX_PARTIALS],
    n_partials: usize,
    integrate: bool,
    expected: usize,
    landed: usize,
}

/// Checks a spline header against the limits and the batch bounds.
///
/// Returns the fault and the offending index.
fn check_header<R: Real>(
    source: &FlatBatch<R>,
    header: &SplineHeader,
    max_order: usize,
) -> Result<(), (FaultCode, usize)> {
    let n = header.n_knots;
    if n > MAX_SPLINE_KNOTS {
        return Err((FaultCode::TooManyKnotsInSpline, n));
    }
    if n < 2 {
        return Err((FaultCode::IndexOutOfRange, n));
    }
    if header.n_coeffs > MAX_SPLINE_COEFFS {
        return Err((FaultCode::SplineTooLarge, header.n_coeffs));
    }
    if header.order > max_order {
        return Err((FaultCode::IllegalValue, header.order));
    }
    if header.n_coeffs != (n - 1) * (header.order + 1) {
        return Err((FaultCode::IllegalValue, header.n_coeffs));
    }
    if source.spline_knots(header).is_none() {
        return Err((FaultCode::IndexOutOfRange, header.knot_offset));
    }
    if source.spline_coeffs(header).is_none() {
        return Err((FaultCode::IndexOutOfRange, header.coeff_offset));
    }
    Ok(())
}

impl<'s, 'b, R: Real> StagingArea<'s, 'b, R> {
    /// Plans staging for `partials` (at most [`MAX_PARTIALS`] are considered).
    ///
    /// A partial whose phase or amplitude header is unusable is reported at
    /// [`Location::Staging`] and left out; the others are still staged.
    pub fn new(
        scratch: &'s mut Scratch<R>,
        source: &'b FlatBatch<R>,
        partials: &[PartialHeader<R>],
        mode: PhaseMode,
        slot: &mut ErrorSlot<'_>,
    ) -> Self {
        let integrate = mode == PhaseMode::IntegratedOmega;
        let max_phase_order = if integrate {
            PHASE_SPLINE_ORDER - 1
        } else {
            PHASE_SPLINE_ORDER
        };

        scratch.knot_runs.clear();
        scratch.coeff_runs.clear();
        let mut staged = [None; MAX_PARTIALS];
        let mut knot_end = 0;
        let mut coeff_end = 0;
        let mut expected = 0;

        let n_partials = partials.len().min(MAX_PARTIALS);
        for (p, header) in partials.iter().take(n_partials).enumerate() {
            let checked = check_header(source, &header.phase, max_phase_order)
                .and_then(|_| check_header(source, &header.amplitude, AMP_SPLINE_ORDER));
            if let Err((code, index)) = checked {
                slot.report(
                    code,
                    Location::Staging,
                    FaultDetail::index(index as i64).for_partial(p),
                );
                continue;
            }

            let mut place = |h: &SplineHeader, coeff_slot: usize| {
                scratch.knot_runs.push(CopyRun {
                    src: h.knot_offset,
                    dst: knot_end,
                    len: h.n_knots,
                });
                scratch.coeff_runs.push(CopyRun {
                    src: h.coeff_offset,
                    dst: coeff_end,
                    len: h.n_coeffs,
                });
                let spline = StagedSpline {
                    knot_start: knot_end,
                    n_knots: h.n_knots,
                    coeff_start: coeff_end,
                    n_coeffs: h.n_coeffs,
                    order: h.order,
                };
                knot_end += h.n_knots;
                coeff_end += coeff_slot;
                expected += h.n_knots + h.n_coeffs;
                spline
            };

            // The antiderivative needs one extra coefficient per segment.
            let phase_slot = if integrate {
                header.phase.n_coeffs + header.phase.n_knots - 1
            } else {
                header.phase.n_coeffs
            };
            let phase = place(&header.phase, phase_slot);
            let amplitude = place(&header.amplitude, header.amplitude.n_coeffs);
            staged[p] = Some(StagedPartial {
                phase,
                amplitude,
                phase_offset: header.phase_offset,
            });
        }

        scratch.knots.clear();
        scratch.knots.resize(knot_end, R::zero());
        scratch.coeffs.clear();
        scratch.coeffs.resize(coeff_end, R::zero());

        Self {
            scratch,
            source,
            partials: staged,
            n_partials,
            integrate,
            expected,
            landed: 0,
        }
    }

    /// Copies every planned run into scratch, splitting each destination
    /// array into `workers` contiguous chunks that are filled concurrently.
    pub fn copy_cooperative(&mut self, workers: usize) {
        let Scratch {
            knots,
            coeffs,
            knot_runs,
            coeff_runs,
        } = &mut *self.scratch;
        self.landed = copy_runs(knots, knot_runs, &self.source.knots, workers)
            + copy_runs(coeffs, coeff_runs, &self.source.coeffs, workers);
    }

    /// Ends staging and returns the read-only view evaluation works from.
    ///
    /// If fewer elements landed than were planned every partial is disabled.
    /// Partials with non-finite or non-increasing knots are reported and
    /// disabled individually.
    pub fn seal(self, slot: &mut ErrorSlot<'_>) -> StagedInstance<'s, R> {
        let StagingArea {
            scratch,
            mut partials,
            n_partials,
            integrate,
            expected,
            landed,
            ..
        } = self;

        if landed != expected {
            warn!(expected, landed, "staging copy incomplete, instance disabled");
            slot.report(
                FaultCode::IndexOutOfRange,
                Location::Staging,
                FaultDetail::at(landed as i64, expected as f64),
            );
            partials = [None; MAX_PARTIALS];
        }

        for (p, entry) in partials.iter_mut().enumerate().take(n_partials) {
            let Some(staged) = entry else {
                continue;
            };
            let knots_ok = check_knots(&scratch.knots, &staged.phase)
                .and_then(|_| check_knots(&scratch.knots, &staged.amplitude));
            if let Err((code, index, value)) = knots_ok {
                slot.report(
                    code,
                    Location::Staging,
                    FaultDetail::at(index as i64, value).for_partial(p),
                );
                *entry = None;
                continue;
            }
            if integrate {
                integrate_omega(
                    &scratch.knots,
                    &mut scratch.coeffs,
                    &mut staged.phase,
                    staged.phase_offset,
                );
            }
        }

        let scratch: &'s Scratch<R> = scratch;
        StagedInstance {
            knots: &scratch.knots,
            coeffs: &scratch.coeffs,
            partials,
            n_partials,
        }
    }
}

/// Copies `runs` from `src` into `dst` using up to `workers` concurrent chunks.
/// Returns the number of elements that landed.
fn copy_runs<R: Real>(dst: &mut [R], runs: &[CopyRun], src: &[R], workers: usize) -> usize {
    if dst.is_empty() {
        return 0;
    }
    if workers <= 1 {
        return copy_chunk(dst, 0, runs, src);
    }
    let chunk = dst.len().div_ceil(workers);
    dst.par_chunks_mut(chunk)
        .enumerate()
        .map(|(w, part)| copy_chunk(part, w * chunk, runs, src))
        .sum()
}

/// Fills `part`, which covers `base..base + part.len()` of the destination.
fn copy_chunk<R: Copy>(part: &mut [R], base: usize, runs: &[CopyRun], src: &[R]) -> usize {
    let end = base + part.len();
    let first = runs.partition_point(|r| r.dst + r.len <= base);
    let mut landed = 0;
    for run in runs.iter().skip(first).take_while(|r| r.dst < end) {
        let lo = run.dst.max(base);
        let hi = (run.dst + run.len).min(end);
        let from = run.src + (lo - run.dst);
        if let (Some(to), Some(from)) = (
            part.get_mut(lo - base..hi - base),
            src.get(from..from + (hi - lo)),
        ) {
            to.copy_from_slice(from);
            landed += hi - lo;
        }
    }
    landed
}

/// Finds the first knot that is non-finite (NAN) or does not exceed its
/// predecessor (ILLEGAL_VALUE).
fn check_knots<R: Real>(knots: &[R], spline: &StagedSpline) -> Result<(), (FaultCode, usize, f64)> {
    let Some(knots) = knots.get(spline.knot_start..spline.knot_start + spline.n_knots) else {
        return Err((FaultCode::IndexOutOfRange, spline.knot_start, f64::NAN));
    };
    if let Some(i) = knots.iter().position(|k| !k.is_finite()) {
        return Err((FaultCode::Nan, i, knots[i].widen()));
    }
    match knots.windows(2).position(|w| w[1] <= w[0]) {
        Some(i) => Err((FaultCode::IllegalValue, i + 1, knots[i + 1].widen())),
        None => Ok(()),
    }
}

/// Replaces an angular-frequency spline of order `k` with its antiderivative
/// of order `k + 1`, taking the value `phase_offset` at the first knot.
///
/// Works in place: the copied coefficients occupy the front of a slot sized
/// for the antiderivative, so segments are expanded from last to first.
fn integrate_omega<R: Real>(
    knots: &[R],
    coeffs: &mut [R],
    spline: &mut StagedSpline,
    phase_offset: R,
) {
    let k = spline.order;
    let segments = spline.n_knots - 1;
    let width = k + 2;
    let (Some(knots), Some(block)) = (
        knots.get(spline.knot_start..spline.knot_start + spline.n_knots),
        coeffs.get_mut(spline.coeff_start..spline.coeff_start + segments * width),
    ) else {
        return;
    };

    for i in (0..segments).rev() {
        for m in (0..=k).rev() {
            block[i * width + m] = block[i * (k + 1) + m] / R::from_index(k + 1 - m);
        }
    }

    let mut phi = phase_offset;
    for (i, seg) in block.chunks_exact_mut(width).enumerate() {
        seg[k + 1] = phi;
        let h = knots[i + 1] - knots[i];
        phi = seg.iter().fold(R::zero(), |acc, &c| acc * h + c);
    }

    spline.order = k + 1;
    spline.n_coeffs = segments * width;
}

/// Read-only staged splines of one instance.
#[derive(Debug, Clone)]
pub struct StagedInstance<'s, R> {
    knots: &'s [R],
    coeffs: &'s [R],
    partials: [Option<StagedPartial<R>>; MAX_PARTIALS],
    n_partials: usize,
}

impl<'s, R: Real> StagedInstance<'s, R> {
    /// Number of partial slots, including disabled ones.
    pub fn n_partials(&self) -> usize {
        self.n_partials
    }

    /// Number of partials that staged successfully.
    pub fn active_partials(&self) -> usize {
        self.partials.iter().filter(|p| p.is_some()).count()
    }

    /// Phase and amplitude splines of partial `p`, or `None` if it is disabled.
    pub fn partial(&self, p: usize) -> Option<(SplineRef<'s, R>, SplineRef<'s, R>)> {
        let staged = self.partials.get(p)?.as_ref()?;
        Some((self.view(&staged.phase), self.view(&staged.amplitude)))
    }

    fn view(&self, spline: &StagedSpline) -> SplineRef<'s, R> {
        let knots = self
            .knots
            .get(spline.knot_start..spline.knot_start + spline.n_knots)
            .unwrap_or_default();
        let coeffs = self
            .coeffs
            .get(spline.coeff_start..spline.coeff_start + spline.n_coeffs)
            .unwrap_or_default();
        SplineRef::new(knots, coeffs, spline.order)
    }
}
