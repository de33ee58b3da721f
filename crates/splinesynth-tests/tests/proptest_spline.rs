//! Property-based tests for the spline evaluator and the launch entry point.
//!
//! These check that the search hint never changes a result, and that no
//! input, however malformed, makes the evaluator or a launch panic.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p splinesynth-tests --test proptest_spline
//! ```

use proptest::prelude::*;

use splinesynth_kernel::spline::locate;
use splinesynth_kernel::{
    evaluate, launch, FlatBatch, InstanceHeader, PartialHeader, SearchHint, SplineHeader, SplineRef,
};
use splinesynth_spec::{
    ExecutionModel, Extrapolation, KernelConfig, PhaseMode, MAX_PARTIALS, PHASE_SPLINE_ORDER,
};

// ============================================================================
// Strategies
// ============================================================================

/// A well-formed spline: strictly increasing knots and matching coefficients.
fn monotone_spline() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, usize)> {
    (
        -100.0f64..100.0,
        prop::collection::vec(0.01f64..10.0, 1..40),
        0..=PHASE_SPLINE_ORDER,
    )
        .prop_flat_map(|(start, gaps, order)| {
            let mut knots = Vec::with_capacity(gaps.len() + 1);
            knots.push(start);
            for gap in &gaps {
                let next = knots[knots.len() - 1] + gap;
                knots.push(next);
            }
            let n_coeffs = gaps.len() * (order + 1);
            (
                Just(knots),
                prop::collection::vec(-10.0f64..10.0, n_coeffs),
                Just(order),
            )
        })
}

/// Any f64, including NaN and the infinities.
fn any_real() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => -1.0e3f64..1.0e3,
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
        1 => Just(f64::NEG_INFINITY),
        1 => Just(0.0),
    ]
}

fn spline_header() -> impl Strategy<Value = SplineHeader> {
    (0usize..64, 0usize..320, 0usize..64, 0usize..400, 0usize..7).prop_map(
        |(knot_offset, n_knots, coeff_offset, n_coeffs, order)| SplineHeader {
            knot_offset,
            n_knots,
            coeff_offset,
            n_coeffs,
            order,
        },
    )
}

fn partial_header() -> impl Strategy<Value = PartialHeader<f64>> {
    (spline_header(), spline_header(), any_real()).prop_map(|(phase, amplitude, phase_offset)| {
        PartialHeader {
            phase,
            amplitude,
            phase_offset,
        }
    })
}

fn instance_header() -> impl Strategy<Value = InstanceHeader<f64>> {
    (
        any_real(),
        prop_oneof![3 => 1.0e-4f64..1.0e-2, 1 => any_real()],
        0usize..200,
        0usize..200,
        0usize..24,
        0usize..20,
        0usize..400,
    )
        .prop_map(
            |(t0, dt, j1, j2, first_partial, n_partials, output_offset)| InstanceHeader {
                t0,
                dt,
                j1,
                j2,
                first_partial,
                n_partials,
                output_offset,
            },
        )
}

fn arbitrary_batch() -> impl Strategy<Value = FlatBatch<f64>> {
    (
        prop_oneof![4 => Just(1u32), 1 => 0u32..4],
        prop::collection::vec(any_real(), 0..400),
        prop::collection::vec(any_real(), 0..600),
        prop::collection::vec(partial_header(), 0..24),
        prop::collection::vec(instance_header(), 0..8),
        0usize..400,
    )
        .prop_map(
            |(function, knots, coeffs, partials, instances, output_len)| FlatBatch {
                function,
                knots,
                coeffs,
                partials,
                instances,
                output_len,
            },
        )
}

fn arbitrary_config() -> impl Strategy<Value = KernelConfig> {
    (
        prop_oneof![Just(PhaseMode::Direct), Just(PhaseMode::IntegratedOmega)],
        prop_oneof![Just(Extrapolation::Extrapolate), Just(Extrapolation::Reject)],
        0usize..5,
        any::<bool>(),
    )
        .prop_map(|(phase_mode, extrapolation, workers, parallel)| {
            let execution = if workers == 0 {
                ExecutionModel::Single
            } else {
                ExecutionModel::Group { workers }
            };
            KernelConfig::default()
                .phase_mode(phase_mode)
                .extrapolation(extrapolation)
                .execution(execution)
                .parallel(parallel)
        })
}

// ============================================================================
// 1. Search Hint Invariance
// ============================================================================

proptest! {
    /// A hint carried across a query sequence never changes a value.
    #[test]
    fn warm_hint_matches_cold_lookup(
        (knots, coeffs, order) in monotone_spline(),
        queries in prop::collection::vec(-200.0f64..600.0, 1..64),
    ) {
        let spline = SplineRef::new(&knots, &coeffs, order);
        let mut warm = SearchHint::cold();
        for &x in &queries {
            let mut cold = SearchHint::cold();
            let a = evaluate(spline, x, &mut warm, Extrapolation::Extrapolate);
            let b = evaluate(spline, x, &mut cold, Extrapolation::Extrapolate);
            prop_assert_eq!(a, b);
            prop_assert_eq!(warm, cold);
        }
    }

    /// Any stale hint, in range or not, resolves to the bisection segment.
    #[test]
    fn stale_hint_resolves_to_containing_segment(
        (knots, coeffs, order) in monotone_spline(),
        hint in 0usize..1000,
        x in -200.0f64..600.0,
    ) {
        let spline = SplineRef::new(&knots, &coeffs, order);
        let from_hint = locate(&spline, x, SearchHint::at(hint), Extrapolation::Extrapolate);
        let cold = locate(&spline, x, SearchHint::cold(), Extrapolation::Extrapolate);
        prop_assert_eq!(from_hint, cold);

        let i = cold.unwrap();
        prop_assert!(i < knots.len() - 1);
        if i > 0 {
            prop_assert!(knots[i] <= x);
        }
        if i + 2 < knots.len() {
            prop_assert!(x < knots[i + 1]);
        }
    }

    /// Every query inside the domain is accepted under the reject policy.
    #[test]
    fn reject_accepts_closed_domain(
        (knots, coeffs, order) in monotone_spline(),
        u in 0.0f64..=1.0,
    ) {
        let (lo, hi) = (knots[0], knots[knots.len() - 1]);
        let x = (lo + u * (hi - lo)).clamp(lo, hi);
        let spline = SplineRef::new(&knots, &coeffs, order);
        let mut hint = SearchHint::cold();
        prop_assert!(evaluate(spline, x, &mut hint, Extrapolation::Reject).is_ok());
    }
}

// ============================================================================
// 2. Robustness Against Malformed Input
// ============================================================================

proptest! {
    /// Arbitrary arrays and orders never panic the evaluator.
    #[test]
    fn evaluate_never_panics(
        knots in prop::collection::vec(any_real(), 0..32),
        coeffs in prop::collection::vec(any_real(), 0..64),
        order in 0usize..8,
        x in any_real(),
        hint in prop::option::of(0usize..64),
    ) {
        let spline = SplineRef::new(&knots, &coeffs, order);
        let mut hint = hint.map_or(SearchHint::cold(), SearchHint::at);
        let _ = evaluate(spline, x, &mut hint, Extrapolation::Extrapolate);
        let _ = evaluate(spline, x, &mut hint, Extrapolation::Reject);
    }

    /// Arbitrary headers never panic a launch, and every instance gets a record.
    #[test]
    fn launch_never_panics(batch in arbitrary_batch(), config in arbitrary_config()) {
        let out = launch(&batch, &config);
        prop_assert_eq!(out.samples.len(), batch.output_len);
        prop_assert_eq!(out.errors.len(), batch.instances.len());
        prop_assert_eq!(out.regions.len(), batch.instances.len());
        prop_assert!(out.samples.iter().all(|s| s.is_finite()));
    }

    /// A launch that reports no fault for an instance wrote its whole region.
    #[test]
    fn clean_instances_own_their_region(batch in arbitrary_batch(), config in arbitrary_config()) {
        let out = launch(&batch, &config);
        for (i, record) in out.errors.iter().enumerate() {
            if !record.is_fault() {
                let header = &batch.instances[i];
                prop_assert!(header.n_partials <= MAX_PARTIALS);
                prop_assert_eq!(out.regions[i].clone(), header.output_range());
            }
        }
    }
}
