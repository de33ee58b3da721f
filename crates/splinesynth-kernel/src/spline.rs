//! Spline evaluator.
//!
//! Evaluates one piecewise polynomial at a scalar query point. The segment
//! lookup starts from a caller-owned [`SearchHint`]: when queries arrive in
//! non-decreasing order (audio time only moves forward) the hint is at most a
//! step behind and the lookup is O(1). A cold or badly stale hint falls back to
//! bisection.
//!
//! Faults are returned as values; nothing here panics or indexes out of bounds.

use splinesynth_spec::{
    Extrapolation, FaultCode, FaultDetail, MAX_SPLINE_COEFFS, MAX_SPLINE_KNOTS,
    PHASE_SPLINE_ORDER,
};

use crate::real::Real;

/// Steps a warm hint may walk before the lookup switches to bisection.
pub const MAX_HINT_WALK: usize = 8;

/// Borrowed view of one spline's knots and coefficients.
///
/// Coefficients are segment-major, `order + 1` per segment, descending powers
/// of `x - knots[i]`.
#[derive(Debug, Clone, Copy)]
pub struct SplineRef<'a, R> {
    knots: &'a [R],
    coeffs: &'a [R],
    order: usize,
}

impl<'a, R: Real> SplineRef<'a, R> {
    /// Wraps borrowed arrays. Shape is checked on every evaluation.
    pub fn new(knots: &'a [R], coeffs: &'a [R], order: usize) -> Self {
        Self {
            knots,
            coeffs,
            order,
        }
    }

    /// Knot positions.
    pub fn knots(&self) -> &'a [R] {
        self.knots
    }

    /// Coefficients.
    pub fn coeffs(&self) -> &'a [R] {
        self.coeffs
    }

    /// Polynomial order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of polynomial segments.
    pub fn segments(&self) -> usize {
        self.knots.len().saturating_sub(1)
    }
}

/// Last resolved segment of one evaluation stream.
///
/// A new stream (a new instance, or a new worker's chunk of one) starts cold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchHint(Option<usize>);

impl SearchHint {
    /// A hint with no cached segment.
    pub const fn cold() -> Self {
        Self(None)
    }

    /// A hint primed at `segment`.
    pub const fn at(segment: usize) -> Self {
        Self(Some(segment))
    }

    /// The cached segment, if any.
    pub fn segment(&self) -> Option<usize> {
        self.0
    }

    /// Forgets the cached segment.
    pub fn reset(&mut self) {
        self.0 = None;
    }
}

/// A fault produced by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineFault {
    /// What went wrong.
    pub code: FaultCode,
    /// Offending index (count, knot or coefficient position) and value.
    pub detail: FaultDetail,
}

impl SplineFault {
    fn new(code: FaultCode, index: usize, value: f64) -> Self {
        Self {
            code,
            detail: FaultDetail::at(index as i64, value),
        }
    }
}

/// Checks size limits and that the coefficient count matches knots and order.
pub fn check_shape<R: Real>(spline: &SplineRef<'_, R>) -> Result<(), SplineFault> {
    let n = spline.knots.len();
    if n < 2 {
        return Err(SplineFault::new(FaultCode::IndexOutOfRange, n, 0.0));
    }
    if n > MAX_SPLINE_KNOTS {
        return Err(SplineFault::new(FaultCode::TooManyKnotsInSpline, n, 0.0));
    }
    if spline.coeffs.len() > MAX_SPLINE_COEFFS {
        return Err(SplineFault::new(
            FaultCode::SplineTooLarge,
            spline.coeffs.len(),
            0.0,
        ));
    }
    if spline.order > PHASE_SPLINE_ORDER {
        return Err(SplineFault::new(FaultCode::IllegalValue, spline.order, 0.0));
    }
    if spline.coeffs.len() != (n - 1) * (spline.order + 1) {
        return Err(SplineFault::new(
            FaultCode::IllegalValue,
            spline.coeffs.len(),
            0.0,
        ));
    }
    Ok(())
}

/// Segment containing `x`, found by bisection over the interior knots.
fn bisect<R: Real>(knots: &[R], x: R) -> usize {
    match knots.get(1..knots.len().saturating_sub(1)) {
        Some(interior) => interior.partition_point(|&k| k <= x),
        None => 0,
    }
}

/// Finds segment `i` with `knots[i] <= x < knots[i+1]`. The first segment also
/// takes everything left of the domain and the last everything right of it.
///
/// Does not touch the hint; [`evaluate`] updates it.
pub fn locate<R: Real>(
    spline: &SplineRef<'_, R>,
    x: R,
    hint: SearchHint,
    policy: Extrapolation,
) -> Result<usize, SplineFault> {
    let knots = spline.knots;
    let n = knots.len();
    if n < 2 {
        return Err(SplineFault::new(FaultCode::IndexOutOfRange, n, x.widen()));
    }
    if x.is_nan() {
        return Err(SplineFault::new(FaultCode::Nan, 0, x.widen()));
    }
    let last = spline.segments() - 1;

    if policy == Extrapolation::Reject {
        if x < knots[0] {
            return Err(SplineFault::new(FaultCode::IndexOutOfRange, 0, x.widen()));
        }
        if x > knots[n - 1] {
            return Err(SplineFault::new(
                FaultCode::IndexOutOfRange,
                n - 1,
                x.widen(),
            ));
        }
    }

    let Some(start) = hint.segment() else {
        return Ok(bisect(knots, x));
    };

    let mut i = start.min(last);
    for _ in 0..=MAX_HINT_WALK {
        if i < last && x >= knots[i + 1] {
            i += 1;
        } else if i > 0 && x < knots[i] {
            i -= 1;
        } else {
            return Ok(i);
        }
    }
    Ok(bisect(knots, x))
}

/// Evaluates the spline at `x`, updating `hint` to the resolved segment.
///
/// # Errors
/// * `INDEX_OUT_OF_RANGE` - fewer than two knots, or `x` outside the domain
///   under [`Extrapolation::Reject`]
/// * `TOO_MANY_KNOTS_IN_SPLINE` / `SPLINE_TOO_LARGE` - size limits exceeded
/// * `ILLEGAL_VALUE` - order too high or inconsistent with the coefficient count
/// * `NAN` - `x`, a consulted coefficient, or the result is NaN
///
/// # Example
/// ```
/// use splinesynth_kernel::spline::{evaluate, SearchHint, SplineRef};
/// use splinesynth_spec::Extrapolation;
///
/// let knots = [0.0, 1.0];
/// let coeffs = [1.0, 0.0];
/// let mut hint = SearchHint::cold();
/// let y = evaluate(SplineRef::new(&knots, &coeffs, 1), 0.3, &mut hint, Extrapolation::Extrapolate);
/// assert!((y.unwrap() - 0.3f64).abs() < 1e-12);
/// ```
pub fn evaluate<R: Real>(
    spline: SplineRef<'_, R>,
    x: R,
    hint: &mut SearchHint,
    policy: Extrapolation,
) -> Result<R, SplineFault> {
    check_shape(&spline)?;
    let i = locate(&spline, x, *hint, policy)?;
    *hint = SearchHint::at(i);

    let width = spline.order + 1;
    let start = i * width;
    let Some(c) = spline.coeffs.get(start..start + width) else {
        return Err(SplineFault::new(FaultCode::IndexOutOfRange, i, x.widen()));
    };
    if let Some(m) = c.iter().position(|v| v.is_nan()) {
        return Err(SplineFault::new(FaultCode::Nan, start + m, x.widen()));
    }

    let h = x - spline.knots[i];
    let value = c.iter().fold(R::zero(), |acc, &cm| acc * h + cm);
    if value.is_nan() {
        return Err(SplineFault::new(FaultCode::Nan, i, x.widen()));
    }
    Ok(value)
}
