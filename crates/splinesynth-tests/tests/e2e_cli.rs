//! CLI pipeline tests: template, validate, render.
//!
//! These drive the command functions the `splinesynth` binary dispatches to,
//! with every file in a temporary directory.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p splinesynth-tests --test e2e_cli
//! ```

use std::fs;
use std::process::ExitCode;

use pretty_assertions::assert_eq;
use splinesynth_cli::commands::{limits, render, template, validate};
use splinesynth_kernel::wav::read_wav;
use splinesynth_spec::{BatchSpec, Precision, MAX_PARTIALS};
use splinesynth_tests::{tone_batch, BatchDir};

fn params() -> template::TemplateParams {
    template::TemplateParams {
        f0: vec![196.0, 293.66],
        partials: 8,
        duration: 0.25,
        brightness: 0.0,
        sample_rate: 8_000,
    }
}

#[test]
fn test_template_validate_render_pipeline() {
    let dir = BatchDir::new();
    let batch_path = dir.output("notes.json");
    let wav_path = dir.output("notes.wav");
    let report_path = dir.output("notes.report.json");

    let code = template::run(batch_path.to_str(), &params()).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let code = validate::run(batch_path.to_str().unwrap(), true).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let code = render::run(
        batch_path.to_str().unwrap(),
        wav_path.to_str(),
        Some("reduced"),
        true,
        report_path.to_str(),
        true,
    )
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let (samples, rate) = read_wav(&wav_path).unwrap();
    assert_eq!(rate, 8_000);
    // Two quarter-second notes back to back.
    assert_eq!(samples.len(), 4_000);
    assert_eq!(samples[0], 0.0);
    assert!(samples.iter().all(|s| s.abs() <= 1.0));
    assert!(samples[1_000].abs() > 0.0 || samples[1_001].abs() > 0.0);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["precision"], "reduced");
    assert_eq!(report["instances"], 2);
    assert_eq!(report["samples"], 4_000);
    assert_eq!(report["mix_samples"], 4_000);
    assert_eq!(report["wav"], wav_path.to_str().unwrap());
}

#[test]
fn test_render_report_matches_library_render() {
    let dir = BatchDir::new();
    let batch = tone_batch(2, 3, 0.05, 8_000);
    let batch_path = dir.add_batch("tones", &batch);
    let report_path = dir.output("tones.report.json");

    let code = render::run(
        batch_path.to_str().unwrap(),
        None,
        Some("full"),
        false,
        report_path.to_str(),
        true,
    )
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let direct = render::render_batch(&batch, Precision::Full).unwrap();
    assert_eq!(report["pcm_hash"], direct.report.pcm_hash.as_str());
    assert!(report.get("wav").is_none());
}

#[test]
fn test_degraded_render_exits_nonzero_but_writes_wav() {
    let dir = BatchDir::new();
    let mut batch = tone_batch(3, 2, 0.05, 8_000);
    let extra = batch.instances[1].partials[0].clone();
    batch.instances[1].partials = vec![extra; MAX_PARTIALS + 1];
    let batch_path = dir.add_batch("overfull", &batch);
    let wav_path = dir.output("overfull.wav");
    let report_path = dir.output("overfull.report.json");

    let code = render::run(
        batch_path.to_str().unwrap(),
        wav_path.to_str(),
        None,
        false,
        report_path.to_str(),
        true,
    )
    .unwrap();
    assert_eq!(code, ExitCode::from(1));
    assert!(wav_path.exists());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let faults = report["faults"].as_array().unwrap();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0]["instance"], 1);
    assert_eq!(faults[0]["name"], "TOO_MANY_PARTIALS");
    assert_eq!(faults[0]["location"], "dispatch");
}

#[test]
fn test_far_future_batch_fails_to_mix_without_writing() {
    let dir = BatchDir::new();
    let mut batch = tone_batch(2, 1, 0.01, 8_000);
    batch.instances[1].t0 = 1e20;
    let batch_path = dir.add_batch("late", &batch);
    let wav_path = dir.output("late.wav");

    let code = validate::run(batch_path.to_str().unwrap(), true).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let result = render::run(batch_path.to_str().unwrap(), wav_path.to_str(), None, true, None, true);
    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("mixdown timeline"));
    assert!(!wav_path.exists());
}

#[test]
fn test_validate_rejects_malformed_batch() {
    let dir = BatchDir::new();
    let mut batch = tone_batch(1, 1, 0.01, 8_000);
    batch.instances[0].partials[0].phase.coeffs.pop();
    let batch_path = dir.add_batch("bad", &batch);

    let code = validate::run(batch_path.to_str().unwrap(), true).unwrap();
    assert_eq!(code, ExitCode::from(1));
}

#[test]
fn test_missing_batch_file_is_an_error() {
    let dir = BatchDir::new();
    let missing = dir.output("missing.json");
    assert!(validate::run(missing.to_str().unwrap(), false).is_err());
    assert!(render::run(missing.to_str().unwrap(), None, None, false, None, false).is_err());
}

#[test]
fn test_limits_queries() {
    assert_eq!(limits::run(None, true).unwrap(), ExitCode::SUCCESS);
    assert_eq!(limits::run(Some(3), true).unwrap(), ExitCode::SUCCESS);
    assert_eq!(limits::run(Some(-1), true).unwrap(), ExitCode::from(1));
}

#[test]
fn test_template_output_parses_back() {
    let batch = template::build_batch(&params()).unwrap();
    let json = batch.to_json_pretty().unwrap();
    assert_eq!(BatchSpec::from_json(&json).unwrap(), batch);
}
