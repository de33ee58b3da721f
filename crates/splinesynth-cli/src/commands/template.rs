//! Template command implementation
//!
//! Writes a ready-to-render batch of bowed-string notes, one instance per
//! fundamental, placed back to back on the timeline.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use splinesynth_spec::instrument::{harmonic_instance, violin_spectrum};
use splinesynth_spec::{BatchSpec, MAX_PARTIALS};
use std::fs;
use std::process::ExitCode;

/// Parameters of the generated batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParams {
    /// Fundamentals in Hz.
    pub f0: Vec<f64>,
    /// Partials per note.
    pub partials: usize,
    /// Note duration in seconds.
    pub duration: f64,
    /// Spectral brightness.
    pub brightness: f64,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Builds the template batch.
pub fn build_batch(params: &TemplateParams) -> Result<BatchSpec> {
    if params.partials == 0 || params.partials > MAX_PARTIALS {
        bail!(
            "partials must be between 1 and {}, got {}",
            MAX_PARTIALS,
            params.partials
        );
    }
    if !(params.duration.is_finite() && params.duration > 0.0) {
        bail!("duration must be positive, got {}", params.duration);
    }
    if params.f0.iter().any(|f| !(f.is_finite() && *f > 0.0)) {
        bail!("fundamentals must be positive");
    }

    // Peak level of 0.5 per note keeps the mixdown clear of clipping.
    let amplitudes = violin_spectrum(params.partials, params.brightness, 0.5);
    let instances = params
        .f0
        .iter()
        .enumerate()
        .map(|(n, &f0)| {
            let mut instance =
                harmonic_instance(f0, &amplitudes, params.duration, params.sample_rate)?;
            instance.t0 = n as f64 * params.duration;
            // Splines are defined from t = 0, so shift them onto the note.
            for partial in &mut instance.partials {
                for k in partial.phase.knots.iter_mut().chain(partial.amplitude.knots.iter_mut()) {
                    *k += instance.t0;
                }
            }
            Ok(instance)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BatchSpec::new(instances).with_sample_rate(params.sample_rate))
}

/// Run the template command
///
/// # Arguments
/// * `out` - Output path; the batch is printed to stdout when absent
/// * `params` - Template parameters
///
/// # Returns
/// Exit code: 0 on success
pub fn run(out: Option<&str>, params: &TemplateParams) -> Result<ExitCode> {
    let batch = build_batch(params)?;
    let json = batch.to_json_pretty()?;

    match out {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write batch: {}", path))?;
            println!(
                "{} {} ({} note(s), {} partial(s) each)",
                "Wrote:".green().bold(),
                path,
                params.f0.len(),
                params.partials
            );
        }
        None => println!("{}", json),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splinesynth_spec::validate_batch;

    fn params() -> TemplateParams {
        TemplateParams {
            f0: vec![220.0, 330.0],
            partials: 6,
            duration: 0.25,
            brightness: 0.0,
            sample_rate: 8_000,
        }
    }

    #[test]
    fn test_template_batch_is_valid() {
        let batch = build_batch(&params()).unwrap();
        assert!(validate_batch(&batch).is_ok());
        assert_eq!(batch.instances.len(), 2);
        assert_eq!(batch.instances[1].t0, 0.25);
        assert_eq!(batch.instances[1].partials[0].amplitude.knots[0], 0.25);
        assert_eq!(batch.instances[0].partials.len(), 6);
    }

    #[test]
    fn test_template_rejects_bad_params() {
        let mut p = params();
        p.partials = MAX_PARTIALS + 1;
        assert!(build_batch(&p).is_err());

        let mut p = params();
        p.duration = 0.0;
        assert!(build_batch(&p).is_err());
    }

    #[test]
    fn test_template_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        assert_eq!(run(path.to_str(), &params()).unwrap(), ExitCode::SUCCESS);
        let batch = BatchSpec::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(batch.sample_rate, 8_000);
    }
}
