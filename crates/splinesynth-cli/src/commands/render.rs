//! Render command implementation
//!
//! Renders a batch at the chosen precision, mixes every instance onto one
//! timeline, writes the mix as WAV, and reports per-instance faults.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use splinesynth_kernel::{mixdown, render, wav, DefaultReal, KernelResult, Real};
use splinesynth_spec::{validate_batch, BatchSpec, ErrorRecord, FaultCode, Location, Precision};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use super::input::load_batch;

/// One faulted instance in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultEntry {
    /// Instance index.
    pub instance: usize,
    /// Integer fault code.
    pub code: i32,
    /// Fault name, e.g. `TOO_MANY_PARTIALS`.
    pub name: String,
    /// Detecting stage.
    pub location: String,
    /// Offending partial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<u16>,
    /// Offending index.
    pub index: i64,
    /// Offending value.
    pub value: f64,
}

impl FaultEntry {
    fn from_record(instance: usize, record: &ErrorRecord) -> Self {
        Self {
            instance,
            code: record.code,
            name: record
                .fault()
                .map_or("UNKNOWN", FaultCode::name)
                .to_string(),
            location: Location::from_tag(record.location)
                .map_or("unknown", Location::as_str)
                .to_string(),
            partial: record.detail.partial,
            index: record.detail.index,
            value: record.detail.value,
        }
    }
}

/// Report written by the render command.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    /// Batch file path.
    pub batch: String,
    /// Precision the batch was rendered at.
    pub precision: String,
    /// Instance count.
    pub instances: usize,
    /// Samples in the flat output buffer.
    pub samples: usize,
    /// Samples in the mixdown.
    pub mix_samples: usize,
    /// Faulted instances.
    pub faults: Vec<FaultEntry>,
    /// BLAKE3 hash of the flat output buffer at native precision.
    pub pcm_hash: String,
    /// WAV file written, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wav: Option<String>,
    /// Render time in milliseconds.
    pub duration_ms: u64,
}

impl RenderReport {
    /// Returns true if no instance faulted.
    pub fn ok(&self) -> bool {
        self.faults.is_empty()
    }
}

/// A rendered batch: the mixdown and its report.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Mono mixdown at the batch sample rate.
    pub mix: Vec<f32>,
    /// Report (the `batch` and `wav` fields are left for the caller).
    pub report: RenderReport,
}

/// Renders `spec` at `precision`.
///
/// Fails only if the mixdown timeline is too long to allocate.
pub fn render_batch(spec: &BatchSpec, precision: Precision) -> KernelResult<Rendered> {
    match precision {
        Precision::Reduced => render_at::<f32>(spec),
        Precision::Full => render_at::<f64>(spec),
    }
}

fn render_at<R: Real>(spec: &BatchSpec) -> KernelResult<Rendered> {
    let start = Instant::now();
    let output = render::<R>(spec);
    let mix = mixdown(spec, &output)?;
    let faults = output
        .errors
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_fault())
        .map(|(i, e)| FaultEntry::from_record(i, e))
        .collect();

    let report = RenderReport {
        batch: String::new(),
        precision: R::PRECISION.as_str().to_string(),
        instances: output.errors.len(),
        samples: output.samples.len(),
        mix_samples: mix.len(),
        faults,
        pcm_hash: output.pcm_hash(),
        wav: None,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    Ok(Rendered { mix, report })
}

/// Run the render command
///
/// # Arguments
/// * `batch_path` - Path to the batch file
/// * `out` - Optional WAV output path
/// * `precision` - Precision name (default: the build's `DefaultReal`)
/// * `strict` - Refuse batches that fail validation
/// * `report_path` - Optional path for the JSON report
/// * `json_output` - Whether to print the report as JSON
///
/// # Returns
/// Exit code: 0 if every instance rendered cleanly, 1 otherwise
pub fn run(
    batch_path: &str,
    out: Option<&str>,
    precision: Option<&str>,
    strict: bool,
    report_path: Option<&str>,
    json_output: bool,
) -> Result<ExitCode> {
    let precision = match precision {
        Some(name) => Precision::by_name(name)
            .ok_or_else(|| anyhow!("unknown precision: {} (expected reduced or full)", name))?,
        None => DefaultReal::PRECISION,
    };
    let spec = load_batch(Path::new(batch_path))?;

    if !json_output {
        println!("{} {}", "Rendering:".cyan().bold(), batch_path);
        println!(
            "{} {} instance(s), {} precision",
            "Batch:".dimmed(),
            spec.instances.len(),
            precision.as_str()
        );
    }

    if strict {
        if let Err(errors) = validate_batch(&spec) {
            if json_output {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                for e in &errors {
                    println!("  {} [{}] {}", "x".red(), e.code(), e);
                }
                println!(
                    "\n{} Batch has {} error(s), not rendered",
                    "FAILED".red().bold(),
                    errors.len()
                );
            }
            return Ok(ExitCode::from(1));
        }
    }

    let Rendered { mix, mut report } =
        render_batch(&spec, precision).with_context(|| format!("Failed to mix batch: {}", batch_path))?;
    report.batch = batch_path.to_string();

    if let Some(out) = out {
        wav::write_wav(Path::new(out), &mix, spec.sample_rate)
            .with_context(|| format!("Failed to write WAV file: {}", out))?;
        report.wav = Some(out.to_string());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {}", path))?;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_report(report: &RenderReport) {
    for f in &report.faults {
        let partial = f
            .partial
            .map(|p| format!(" partial {}", p))
            .unwrap_or_default();
        println!(
            "  {} instance {}: {} at {}{} (index {}, value {})",
            "x".red(),
            f.instance,
            f.name,
            f.location,
            partial.dimmed(),
            f.index,
            f.value
        );
    }
    if let Some(wav) = &report.wav {
        println!("{} {}", "Wrote:".dimmed(), wav);
    }
    println!("{} {}", "PCM hash:".dimmed(), &report.pcm_hash[..16]);

    if report.ok() {
        println!(
            "\n{} {} instance(s), {} sample(s) ({}ms)",
            "SUCCESS".green().bold(),
            report.instances,
            report.samples,
            report.duration_ms
        );
    } else {
        println!(
            "\n{} {} of {} instance(s) faulted ({}ms)",
            "DEGRADED".yellow().bold(),
            report.faults.len(),
            report.instances,
            report.duration_ms
        );
    }
}
