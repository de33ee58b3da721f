//! Host driver: turns a [`BatchSpec`] into a [`FlatBatch`], launches it, and
//! post-processes the output.

use splinesynth_spec::{validate_batch, BatchSpec, PartialSpec};
use tracing::debug;

use crate::abi::{BatchOutput, FlatBatch, PartialHeader};
use crate::dispatch::launch;
use crate::error::{KernelError, KernelResult};
use crate::real::Real;

/// Flattens `spec` into the launch layout.
///
/// Nothing is validated or truncated here; malformed instances are flattened
/// as they are and fault inside the launch.
pub fn flatten<R: Real>(spec: &BatchSpec) -> FlatBatch<R> {
    let mut batch = FlatBatch::new(spec.function);
    for instance in &spec.instances {
        let partials: Vec<PartialHeader<R>> = instance
            .partials
            .iter()
            .map(|p| flatten_partial(&mut batch, p))
            .collect();
        batch.push_instance(instance.t0, instance.dt, instance.j1, instance.j2, partials);
    }
    debug!(
        knots = batch.knots.len(),
        coeffs = batch.coeffs.len(),
        partials = batch.partials.len(),
        "flattened batch"
    );
    batch
}

fn flatten_partial<R: Real>(batch: &mut FlatBatch<R>, partial: &PartialSpec) -> PartialHeader<R> {
    let phase = &partial.phase;
    let amplitude = &partial.amplitude;
    PartialHeader {
        phase: batch.push_spline(&phase.knots, &phase.coeffs, phase.order),
        amplitude: batch.push_spline(&amplitude.knots, &amplitude.coeffs, amplitude.order),
        phase_offset: R::lit(partial.phase_offset),
    }
}

/// Flattens and launches `spec` with its own config.
pub fn render<R: Real>(spec: &BatchSpec) -> BatchOutput<R> {
    launch(&flatten::<R>(spec), &spec.config)
}

/// Like [`render`], but refuses batches that fail host-side validation.
pub fn render_checked<R: Real>(spec: &BatchSpec) -> KernelResult<BatchOutput<R>> {
    validate_batch(spec)?;
    Ok(render(spec))
}

/// Longest timeline [`mixdown`] will allocate, in samples (about 100 minutes
/// at 44.1 kHz).
pub const MAX_MIX_SAMPLES: usize = 1 << 28;

/// Mixes every instance onto one timeline at `spec.sample_rate`.
///
/// Sample `j` of an instance lands at `round((t0 + j * dt) * sample_rate)`.
/// Faulted instances are mixed too; their degraded output is already bounded.
/// Fails with [`KernelError::Timeline`] if the last sample lands at or past
/// [`MAX_MIX_SAMPLES`].
pub fn mixdown<R: Real>(spec: &BatchSpec, output: &BatchOutput<R>) -> KernelResult<Vec<f32>> {
    let rate = f64::from(spec.sample_rate);
    let position = |t: f64| (t * rate).round();

    let last = spec
        .instances
        .iter()
        .filter(|inst| inst.j2 > inst.j1)
        .map(|inst| position(inst.time_at(inst.j2 - 1)))
        .filter(|p| p.is_finite() && *p >= 0.0)
        .reduce(f64::max);
    let Some(last) = last else {
        return Ok(Vec::new());
    };
    if last >= MAX_MIX_SAMPLES as f64 {
        return Err(KernelError::Timeline {
            end: last,
            max: MAX_MIX_SAMPLES,
        });
    }
    let mut mix = vec![0.0f32; last as usize + 1];

    for (i, inst) in spec.instances.iter().enumerate() {
        let Some(samples) = output.instance_samples(i) else {
            continue;
        };
        for (k, s) in samples.iter().enumerate() {
            let p = position(inst.time_at(inst.j1 + k));
            if p >= 0.0 && p < mix.len() as f64 {
                mix[p as usize] += s.widen() as f32;
            }
        }
    }
    Ok(mix)
}
