//! Compiled-in size limits and the size-limit query surface.
//!
//! The kernel never reads past these maxima. Drivers use [`SizeLimits`] (or the
//! integer [`max_size`] query) to validate buffer shapes before a launch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of knots in one spline.
pub const MAX_SPLINE_KNOTS: usize = 300;

/// Polynomial order of amplitude splines (cubic).
pub const AMP_SPLINE_ORDER: usize = 3;

/// Polynomial order of phase splines. Greater than [`AMP_SPLINE_ORDER`] so that
/// an integrated cubic angular-frequency spline still fits.
pub const PHASE_SPLINE_ORDER: usize = 4;

/// Maximum number of coefficients in one spline.
pub const MAX_SPLINE_COEFFS: usize = MAX_SPLINE_KNOTS * (PHASE_SPLINE_ORDER + 1);

/// Maximum number of partials evaluated per instance.
pub const MAX_PARTIALS: usize = 16;

/// Maximum number of instances in one batch.
pub const MAX_INSTANCES: usize = 65536;

/// Typed form of the size-limit query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitQuery {
    /// [`MAX_SPLINE_KNOTS`]
    MaxKnots,
    /// [`PHASE_SPLINE_ORDER`], the larger of the two spline orders.
    MaxOrder,
    /// [`MAX_SPLINE_COEFFS`]
    MaxCoeffs,
    /// [`MAX_PARTIALS`]
    MaxPartials,
    /// [`MAX_INSTANCES`]
    MaxInstances,
}

impl LimitQuery {
    /// All queries, in wire-index order.
    pub const ALL: [LimitQuery; 5] = [
        LimitQuery::MaxKnots,
        LimitQuery::MaxOrder,
        LimitQuery::MaxCoeffs,
        LimitQuery::MaxPartials,
        LimitQuery::MaxInstances,
    ];

    /// Maps a wire index (0..=4) to a query.
    pub fn from_index(what: i32) -> Option<Self> {
        usize::try_from(what)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Returns the compiled-in value answered by this query.
    pub fn value(self) -> usize {
        match self {
            LimitQuery::MaxKnots => MAX_SPLINE_KNOTS,
            LimitQuery::MaxOrder => PHASE_SPLINE_ORDER,
            LimitQuery::MaxCoeffs => MAX_SPLINE_COEFFS,
            LimitQuery::MaxPartials => MAX_PARTIALS,
            LimitQuery::MaxInstances => MAX_INSTANCES,
        }
    }

    /// Snake-case name used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            LimitQuery::MaxKnots => "max_knots",
            LimitQuery::MaxOrder => "max_order",
            LimitQuery::MaxCoeffs => "max_coeffs",
            LimitQuery::MaxPartials => "max_partials",
            LimitQuery::MaxInstances => "max_instances",
        }
    }
}

impl fmt::Display for LimitQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer size-limit query: `0` knots, `1` order, `2` coefficients,
/// `3` partials, `4` instances. Unknown selectors return `-1`.
pub fn max_size(what: i32) -> i32 {
    LimitQuery::from_index(what)
        .and_then(|q| i32::try_from(q.value()).ok())
        .unwrap_or(-1)
}

/// Snapshot of every compiled-in limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Maximum knots per spline.
    pub max_knots: usize,
    /// Amplitude spline order.
    pub amp_order: usize,
    /// Phase spline order.
    pub phase_order: usize,
    /// Maximum coefficients per spline.
    pub max_coeffs: usize,
    /// Maximum partials per instance.
    pub max_partials: usize,
    /// Maximum instances per batch.
    pub max_instances: usize,
}

impl SizeLimits {
    /// The limits this build was compiled with.
    pub const fn compiled() -> Self {
        Self {
            max_knots: MAX_SPLINE_KNOTS,
            amp_order: AMP_SPLINE_ORDER,
            phase_order: PHASE_SPLINE_ORDER,
            max_coeffs: MAX_SPLINE_COEFFS,
            max_partials: MAX_PARTIALS,
            max_instances: MAX_INSTANCES,
        }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self::compiled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_query_matches_constants() {
        assert_eq!(max_size(0), 300);
        assert_eq!(max_size(1), 4);
        assert_eq!(max_size(2), 1500);
        assert_eq!(max_size(3), 16);
        assert_eq!(max_size(4), 65536);
    }

    #[test]
    fn test_unknown_query_is_negative() {
        assert_eq!(max_size(5), -1);
        assert_eq!(max_size(-1), -1);
        assert_eq!(LimitQuery::from_index(99), None);
    }

    #[test]
    fn test_phase_order_covers_amplitude_order() {
        let limits = SizeLimits::compiled();
        assert!(limits.phase_order > limits.amp_order);
        assert_eq!(limits.max_coeffs, limits.max_knots * (limits.phase_order + 1));
    }
}
