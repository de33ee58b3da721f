//! Instrument helpers that produce ready-made partial sets.
//!
//! These build splines from closed-form shapes only (straight segments and
//! constant spectra); nothing here fits curves to data.

use crate::batch::{InstanceSpec, PartialSpec};
use crate::spline::{SplineShapeError, SplineSpec};

/// Amplitude spectrum of a bowed violin string (bridge displacement).
///
/// Amplitudes fall as `n^-2` (the envelope of a triangle wave's Fourier
/// series) and are attenuated by up to 10 dB of power above a roll-off point
/// `4.2 + 0.4 * brightness` octaves above the fundamental, with a 0.3 octave
/// knee. The result is scaled so its root-sum-square equals `norm`.
///
/// # Arguments
/// * `n_partials` - Number of partials (index 0 is the fundamental)
/// * `brightness` - `0` ordinario, `1` sul ponticello, `-1` sul tasto
/// * `norm` - Target root-sum-square of the amplitudes
pub fn violin_spectrum(n_partials: usize, brightness: f64, norm: f64) -> Vec<f64> {
    const KNEE: f64 = 0.3;
    const MAX_DB: f64 = 10.0;

    let roll_off = 2f64.powf(4.2 + 0.4 * brightness);
    let amplitudes: Vec<f64> = (1..=n_partials)
        .map(|n| {
            let n = n as f64;
            let r = n - roll_off;
            let roll_db = if r <= 0.0 {
                0.0
            } else if r > KNEE {
                MAX_DB
            } else {
                (r / KNEE) * MAX_DB
            };
            // Half the dB because these are amplitudes, not powers.
            n.powi(-2) * 10f64.powf(-0.5 * roll_db / 10.0)
        })
        .collect();

    let rss = amplitudes.iter().map(|a| a * a).sum::<f64>().sqrt();
    if rss == 0.0 {
        return amplitudes;
    }
    amplitudes.iter().map(|a| a * norm / rss).collect()
}

/// Piecewise-linear attack/hold/release envelope over `[0, duration]`.
pub fn ramp_envelope(
    peak: f64,
    attack: f64,
    release: f64,
    duration: f64,
) -> Result<SplineSpec, SplineShapeError> {
    let attack = attack.clamp(1e-4, duration / 2.0);
    let release = release.clamp(1e-4, duration / 2.0);
    let hold_end = duration - release;
    let mut parts = vec![SplineSpec::linear(0.0, attack, 0.0, peak)];
    if hold_end > attack {
        parts.push(SplineSpec::linear(attack, hold_end, peak, peak));
    }
    parts.push(SplineSpec::linear(hold_end.max(attack), duration, peak, 0.0));
    SplineSpec::join(&parts)
}

/// A harmonic instance at fundamental `f0` where partial `n` has frequency
/// `(n + 1) * f0` and amplitude `amplitudes[n]` shaped by a ramp envelope.
pub fn harmonic_instance(
    f0: f64,
    amplitudes: &[f64],
    duration: f64,
    sample_rate: u32,
) -> Result<InstanceSpec, SplineShapeError> {
    let partials = amplitudes
        .iter()
        .enumerate()
        .map(|(n, &amp)| {
            let envelope = ramp_envelope(amp, 0.02, 0.05, duration)?;
            Ok(PartialSpec::steady(f0 * (n + 1) as f64, envelope, duration))
        })
        .collect::<Result<Vec<_>, SplineShapeError>>()?;
    Ok(InstanceSpec::at_rate(sample_rate, duration, partials))
}
