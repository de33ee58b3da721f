//! Host-side validation of batch descriptions against the compiled-in limits.
//!
//! The kernel already guards every one of these conditions with a per-instance
//! fault, so validation is advisory: drivers call it to reject a batch up front
//! instead of reading back faulted instances.

use crate::batch::{BatchSpec, InstanceSpec, FN_OSCILLATOR};
use crate::config::{ExecutionModel, PhaseMode};
use crate::error::{FaultCode, ValidationError, ValidationResult};
use crate::limits::{
    AMP_SPLINE_ORDER, MAX_INSTANCES, MAX_PARTIALS, MAX_SPLINE_COEFFS, MAX_SPLINE_KNOTS,
    PHASE_SPLINE_ORDER,
};
use crate::spline::SplineSpec;

/// Validates a whole batch, collecting every error.
///
/// # Example
/// ```
/// use splinesynth_spec::{validate_batch, BatchSpec, InstanceSpec};
///
/// let batch = BatchSpec::new(vec![InstanceSpec::at_rate(44_100, 0.1, vec![])]);
/// assert!(validate_batch(&batch).is_ok());
/// ```
pub fn validate_batch(batch: &BatchSpec) -> ValidationResult {
    let mut errors = Vec::new();

    if batch.function != FN_OSCILLATOR {
        errors.push(ValidationError::UndefinedFunction { id: batch.function });
    }

    if let ExecutionModel::Group { workers: 0 } = batch.config.execution {
        errors.push(ValidationError::Config {
            message: "group execution needs at least one worker".to_string(),
        });
    }

    if batch.instances.len() > MAX_INSTANCES {
        errors.push(ValidationError::TooManyInstances {
            count: batch.instances.len(),
            max: MAX_INSTANCES,
        });
    }

    let max_phase_order = match batch.config.phase_mode {
        PhaseMode::Direct => PHASE_SPLINE_ORDER,
        PhaseMode::IntegratedOmega => PHASE_SPLINE_ORDER - 1,
    };

    for (i, instance) in batch.instances.iter().enumerate() {
        validate_instance(i, instance, max_phase_order, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_instance(
    index: usize,
    instance: &InstanceSpec,
    max_phase_order: usize,
    errors: &mut Vec<ValidationError>,
) {
    if !instance.t0.is_finite() {
        errors.push(ValidationError::Instance {
            instance: index,
            field: "t0",
            message: format!("must be finite, got {}", instance.t0),
        });
    }
    if !(instance.dt.is_finite() && instance.dt > 0.0) {
        errors.push(ValidationError::Instance {
            instance: index,
            field: "dt",
            message: format!("must be positive and finite, got {}", instance.dt),
        });
    }
    if instance.j2 < instance.j1 {
        errors.push(ValidationError::Instance {
            instance: index,
            field: "j2",
            message: format!("must not precede j1 ({} < {})", instance.j2, instance.j1),
        });
    }
    if instance.partials.len() > MAX_PARTIALS {
        errors.push(ValidationError::TooManyPartials {
            instance: index,
            count: instance.partials.len(),
            max: MAX_PARTIALS,
        });
    }

    for (p, partial) in instance.partials.iter().take(MAX_PARTIALS).enumerate() {
        let base = format!("instances[{}].partials[{}]", index, p);
        if let Err((fault, e)) = validate_spline(&partial.phase, max_phase_order) {
            errors.push(ValidationError::spline(format!("{}.phase", base), fault, e));
        }
        if let Err((fault, e)) = validate_spline(&partial.amplitude, AMP_SPLINE_ORDER) {
            errors.push(ValidationError::spline(format!("{}.amplitude", base), fault, e));
        }
        if !partial.phase_offset.is_finite() {
            errors.push(ValidationError::spline(
                format!("{}.phase_offset", base),
                FaultCode::Nan,
                "must be finite",
            ));
        }
    }
}

/// Checks one spline's shape and size limits.
///
/// The error carries the fault the kernel would raise for the same spline.
pub fn validate_spline(spline: &SplineSpec, max_order: usize) -> Result<(), (FaultCode, String)> {
    if spline.knots.len() > MAX_SPLINE_KNOTS {
        return Err((FaultCode::TooManyKnotsInSpline, format!(
            "{} knots exceeds maximum of {}",
            spline.knots.len(),
            MAX_SPLINE_KNOTS
        )));
    }
    if spline.coeffs.len() > MAX_SPLINE_COEFFS {
        return Err((FaultCode::SplineTooLarge, format!(
            "{} coefficients exceeds maximum of {}",
            spline.coeffs.len(),
            MAX_SPLINE_COEFFS
        )));
    }
    if spline.order > max_order {
        return Err((FaultCode::IllegalValue, format!(
            "order {} exceeds maximum of {}",
            spline.order, max_order
        )));
    }
    spline.validate().map_err(|e| (e.fault(), e.to_string()))?;
    if let Some(i) = spline.coeffs.iter().position(|c| c.is_nan()) {
        return Err((FaultCode::Nan, format!("coefficient {} is NaN", i)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PartialSpec;
    use crate::config::KernelConfig;

    fn sine_partial() -> PartialSpec {
        PartialSpec::steady(440.0, SplineSpec::constant(0.5, 0.0, 1.0), 1.0)
    }

    #[test]
    fn test_valid_batch_passes() {
        let batch = BatchSpec::new(vec![InstanceSpec::at_rate(
            44_100,
            0.01,
            vec![sine_partial(), sine_partial()],
        )]);
        assert!(validate_batch(&batch).is_ok());
    }

    #[test]
    fn test_too_many_partials_reported() {
        let batch = BatchSpec::new(vec![InstanceSpec::at_rate(
            44_100,
            0.01,
            vec![sine_partial(); MAX_PARTIALS + 1],
        )]);
        let errors = validate_batch(&batch).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::TooManyPartials { count: 17, .. })));
    }

    #[test]
    fn test_bad_instance_fields_reported() {
        let mut inst = InstanceSpec::at_rate(44_100, 0.01, vec![]);
        inst.dt = 0.0;
        inst.j1 = 10;
        inst.j2 = 5;
        let errors = validate_batch(&BatchSpec::new(vec![inst])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code() == "V004"));
    }

    #[test]
    fn test_integrated_phase_limits_omega_order() {
        let quartic = SplineSpec::new(vec![0.0, 1.0], vec![1.0, 0.0, 0.0, 0.0, 0.0], 4);
        let partial = PartialSpec::new(quartic, SplineSpec::constant(1.0, 0.0, 1.0));
        let inst = InstanceSpec::at_rate(100, 0.1, vec![partial]);

        let direct = BatchSpec::new(vec![inst.clone()]);
        assert!(validate_batch(&direct).is_ok());

        let integrated = BatchSpec::new(vec![inst])
            .with_config(KernelConfig::default().phase_mode(PhaseMode::IntegratedOmega));
        assert!(validate_batch(&integrated).is_err());
    }

    #[test]
    fn test_undefined_function_reported() {
        let mut batch = BatchSpec::new(vec![]);
        batch.function = 9;
        let errors = validate_batch(&batch).unwrap_err();
        assert_eq!(errors[0].code(), "V005");
    }

    #[test]
    fn test_oversized_spline_reported() {
        let n = MAX_SPLINE_KNOTS + 1;
        let knots: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let spline = SplineSpec::new(knots, vec![0.0; n - 1], 0);
        let (fault, message) = validate_spline(&spline, 3).unwrap_err();
        assert_eq!(fault, FaultCode::TooManyKnotsInSpline);
        assert!(message.contains("knots"));
    }

    #[test]
    fn test_spline_errors_carry_kernel_fault() {
        let too_many_coeffs = SplineSpec::new(vec![0.0, 1.0], vec![0.0; MAX_SPLINE_COEFFS + 1], 0);
        assert_eq!(validate_spline(&too_many_coeffs, 4).unwrap_err().0, FaultCode::SplineTooLarge);

        let one_knot = SplineSpec::new(vec![0.0], vec![], 0);
        assert_eq!(validate_spline(&one_knot, 4).unwrap_err().0, FaultCode::IndexOutOfRange);

        let infinite_knot = SplineSpec::new(vec![0.0, f64::INFINITY], vec![1.0], 0);
        assert_eq!(validate_spline(&infinite_knot, 4).unwrap_err().0, FaultCode::Nan);

        let repeated_knot = SplineSpec::new(vec![0.0, 0.0], vec![1.0], 0);
        assert_eq!(validate_spline(&repeated_knot, 4).unwrap_err().0, FaultCode::IllegalValue);

        let nan_coeff = SplineSpec::new(vec![0.0, 1.0], vec![f64::NAN], 0);
        assert_eq!(validate_spline(&nan_coeff, 4).unwrap_err().0, FaultCode::Nan);
    }

    #[test]
    fn test_amplitude_order_is_capped_below_phase_order() {
        let quartic = SplineSpec::new(vec![0.0, 1.0], vec![1.0, 0.0, 0.0, 0.0, 0.0], 4);
        let partial = PartialSpec::new(SplineSpec::constant(0.0, 0.0, 1.0), quartic);
        let batch = BatchSpec::new(vec![InstanceSpec::at_rate(100, 0.1, vec![partial])]);

        let errors = validate_batch(&batch).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].fault(), FaultCode::IllegalValue);
        assert!(errors[0].to_string().contains("amplitude"));
        assert!(errors[0].to_string().contains("maximum of 3"));
    }
}
