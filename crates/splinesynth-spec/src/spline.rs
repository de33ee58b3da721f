//! Owned piecewise-polynomial splines as supplied by the host.
//!
//! A spline with `n` knots has `n - 1` segments. Coefficients are stored
//! segment-major, `order + 1` per segment, in descending power order relative to
//! the segment's left knot:
//!
//! ```text
//! s(x) = c[i*(k+1)] * (x - knots[i])^k + ... + c[i*(k+1)+k]
//! ```
//!
//! This crate never fits splines; coefficients arrive precomputed. The
//! utilities here only reshape existing splines (restrict, concatenate, scale).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FaultCode;

/// Tolerance used when checking that two splines share an end point.
/// Slightly longer than one sample at 44.1 kHz.
pub const JOIN_TOLERANCE: f64 = 3.0e-5;

/// Shape errors in a spline description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineShapeError {
    /// Fewer than two knots means there is no segment.
    #[error("spline needs at least 2 knots, got {0}")]
    TooFewKnots(usize),

    /// A knot is NaN or infinite.
    #[error("knot {index} is not finite")]
    NonFiniteKnot {
        /// Index of the offending knot.
        index: usize,
    },

    /// Knots must be strictly increasing.
    #[error("knots must be strictly increasing (knot {index} does not exceed its predecessor)")]
    NotIncreasing {
        /// Index of the first knot that does not exceed its predecessor.
        index: usize,
    },

    /// Coefficient array length does not match knots and order.
    #[error("expected {expected} coefficients ({segments} segments of order {order}), got {found}")]
    CoefficientCount {
        /// Required length.
        expected: usize,
        /// Actual length.
        found: usize,
        /// Segment count.
        segments: usize,
        /// Polynomial order.
        order: usize,
    },

    /// Segments or splines of different orders were combined.
    #[error("polynomial orders differ: {left} vs {right}")]
    MixedOrder {
        /// Order of the first operand.
        left: usize,
        /// Order of the second operand.
        right: usize,
    },

    /// Two splines being concatenated do not meet.
    #[error("end point {end} and start point {start} do not coincide")]
    Discontinuous {
        /// Last knot of the left spline.
        end: f64,
        /// First knot of the right spline.
        start: f64,
    },

    /// A restriction range does not cover any segment.
    #[error("range [{t1}, {t2}] does not overlap the spline domain")]
    EmptyRange {
        /// Requested start.
        t1: f64,
        /// Requested end.
        t2: f64,
    },
}

impl SplineShapeError {
    /// Fault the kernel raises for a spline with this shape.
    pub fn fault(&self) -> FaultCode {
        match self {
            SplineShapeError::TooFewKnots(_) => FaultCode::IndexOutOfRange,
            SplineShapeError::NonFiniteKnot { .. } => FaultCode::Nan,
            _ => FaultCode::IllegalValue,
        }
    }
}

/// A spline as described by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineSpec {
    /// Knot positions, strictly increasing.
    pub knots: Vec<f64>,
    /// Segment-major coefficients, descending powers.
    pub coeffs: Vec<f64>,
    /// Polynomial order of every segment.
    pub order: usize,
}

impl SplineSpec {
    /// Wraps raw arrays without checking them. Use [`SplineSpec::validate`] or
    /// let the kernel reject malformed input at staging time.
    pub fn new(knots: Vec<f64>, coeffs: Vec<f64>, order: usize) -> Self {
        Self {
            knots,
            coeffs,
            order,
        }
    }

    /// Builds a spline from one coefficient row per segment.
    ///
    /// # Arguments
    /// * `knots` - Knot positions (`segments.len() + 1` of them)
    /// * `segments` - Descending-power coefficients for each segment
    pub fn from_segments(
        knots: Vec<f64>,
        segments: &[Vec<f64>],
    ) -> Result<Self, SplineShapeError> {
        let order = segments.first().map(|s| s.len().saturating_sub(1)).unwrap_or(0);
        let mut coeffs = Vec::with_capacity(segments.len() * (order + 1));
        for segment in segments {
            let seg_order = segment.len().saturating_sub(1);
            if seg_order != order {
                return Err(SplineShapeError::MixedOrder {
                    left: order,
                    right: seg_order,
                });
            }
            coeffs.extend_from_slice(segment);
        }
        let spline = Self::new(knots, coeffs, order);
        spline.validate()?;
        Ok(spline)
    }

    /// A constant function over `[t_start, t_end]`.
    pub fn constant(value: f64, t_start: f64, t_end: f64) -> Self {
        Self::new(vec![t_start, t_end], vec![value], 0)
    }

    /// The straight line through `(t0, v0)` and `(t1, v1)`.
    pub fn linear(t0: f64, t1: f64, v0: f64, v1: f64) -> Self {
        let slope = (v1 - v0) / (t1 - t0);
        Self::new(vec![t0, t1], vec![slope, v0], 1)
    }

    /// Number of polynomial segments.
    pub fn segment_count(&self) -> usize {
        self.knots.len().saturating_sub(1)
    }

    /// Coefficients of segment `i`.
    pub fn segment(&self, i: usize) -> Option<&[f64]> {
        let width = self.order + 1;
        self.coeffs.get(i * width..(i + 1) * width)
    }

    /// Checks knot ordering and coefficient count.
    pub fn validate(&self) -> Result<(), SplineShapeError> {
        let n = self.knots.len();
        if n < 2 {
            return Err(SplineShapeError::TooFewKnots(n));
        }
        for (index, knot) in self.knots.iter().enumerate() {
            if !knot.is_finite() {
                return Err(SplineShapeError::NonFiniteKnot { index });
            }
        }
        if let Some(index) = (1..n).find(|&i| self.knots[i] <= self.knots[i - 1]) {
            return Err(SplineShapeError::NotIncreasing { index });
        }
        let segments = n - 1;
        let expected = segments * (self.order + 1);
        if self.coeffs.len() != expected {
            return Err(SplineShapeError::CoefficientCount {
                expected,
                found: self.coeffs.len(),
                segments,
                order: self.order,
            });
        }
        Ok(())
    }

    /// The domain `(first knot, last knot)`.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.knots.first()?, *self.knots.last()?))
    }

    /// Intersection of the two domains, if they overlap.
    pub fn time_intersection(&self, other: &SplineSpec) -> Option<(f64, f64)> {
        let (a0, a1) = self.time_range()?;
        let (b0, b1) = other.time_range()?;
        let lo = a0.max(b0);
        let hi = a1.min(b1);
        (lo <= hi).then_some((lo, hi))
    }

    /// Returns a copy with every coefficient multiplied by `s`.
    pub fn scaled(&self, s: f64) -> Self {
        Self {
            knots: self.knots.clone(),
            coeffs: self.coeffs.iter().map(|c| c * s).collect(),
            order: self.order,
        }
    }

    /// Keeps only the segments needed to evaluate over `[t1, t2]`.
    pub fn restrict(&self, t1: f64, t2: f64) -> Result<Self, SplineShapeError> {
        self.validate()?;
        if t1 > t2 {
            return Err(SplineShapeError::EmptyRange { t1, t2 });
        }
        let segments = self.segment_count();
        let needed: Vec<usize> = (0..segments)
            .filter(|&i| self.knots[i + 1] >= t1 && self.knots[i] <= t2)
            .collect();
        let (Some(&lo), Some(&hi)) = (needed.first(), needed.last()) else {
            return Err(SplineShapeError::EmptyRange { t1, t2 });
        };
        let width = self.order + 1;
        Ok(Self {
            knots: self.knots[lo..=hi + 1].to_vec(),
            coeffs: self.coeffs[lo * width..(hi + 1) * width].to_vec(),
            order: self.order,
        })
    }

    /// Appends `next`, whose first knot must coincide with this spline's last knot.
    pub fn concat(&self, next: &SplineSpec) -> Result<Self, SplineShapeError> {
        if self.order != next.order {
            return Err(SplineShapeError::MixedOrder {
                left: self.order,
                right: next.order,
            });
        }
        let (Some(&end), Some(&start)) = (self.knots.last(), next.knots.first()) else {
            return Err(SplineShapeError::TooFewKnots(
                self.knots.len().min(next.knots.len()),
            ));
        };
        if (end - start).abs() > JOIN_TOLERANCE {
            return Err(SplineShapeError::Discontinuous { end, start });
        }
        let mut knots = self.knots.clone();
        knots.extend_from_slice(&next.knots[1..]);
        let mut coeffs = self.coeffs.clone();
        coeffs.extend_from_slice(&next.coeffs);
        Ok(Self {
            knots,
            coeffs,
            order: self.order,
        })
    }

    /// Concatenates a run of splines left to right.
    pub fn join(parts: &[SplineSpec]) -> Result<Self, SplineShapeError> {
        let Some((first, rest)) = parts.split_first() else {
            return Err(SplineShapeError::TooFewKnots(0));
        };
        rest.iter().try_fold(first.clone(), |acc, part| acc.concat(part))
    }
}
