//! Test fixtures: batches, splines, and temporary batch files.

use std::f64::consts::TAU;
use std::fs;
use std::path::{Path, PathBuf};

use splinesynth_spec::{BatchSpec, InstanceSpec, PartialSpec, SplineSpec};
use tempfile::TempDir;

/// Not-a-knot cubic through `(k, k^4)` for `k = 0..=4`.
pub fn quartic_spline() -> SplineSpec {
    SplineSpec::new(
        vec![0.0, 1.0, 2.0, 3.0, 4.0],
        vec![
            5.0, -8.0, 4.0, 0.0, //
            5.0, 7.0, 3.0, 1.0, //
            11.0, 22.0, 32.0, 16.0, //
            11.0, 55.0, 109.0, 81.0,
        ],
        3,
    )
}

/// A batch of `notes` harmonic tones, one instance each.
///
/// Note `n` has fundamental `110 * (n + 1)` Hz and `partials` harmonics with
/// amplitude `0.5 / (k + 1)` decaying linearly to a third of that.
pub fn tone_batch(notes: usize, partials: usize, duration: f64, sample_rate: u32) -> BatchSpec {
    let instances = (0..notes)
        .map(|n| {
            let f0 = 110.0 * (n + 1) as f64;
            let partials = (0..partials)
                .map(|k| {
                    let amp = 0.5 / (k + 1) as f64;
                    let envelope = SplineSpec::linear(0.0, duration, amp, amp / 3.0);
                    PartialSpec::steady(f0 * (k + 1) as f64, envelope, duration)
                })
                .collect();
            InstanceSpec::at_rate(sample_rate, duration, partials)
        })
        .collect();
    BatchSpec::new(instances).with_sample_rate(sample_rate)
}

/// Direct and integrated forms of one linear chirp from `f_start` to `f_end`
/// Hz over `[0, duration]`.
///
/// Returns `(direct, integrated)`: the first has a quadratic phase spline, the
/// second a linear angular-frequency spline with a zero phase offset.
pub fn chirp_partial(f_start: f64, f_end: f64, duration: f64) -> (PartialSpec, PartialSpec) {
    let w0 = TAU * f_start;
    let slope = TAU * (f_end - f_start) / duration;
    let amplitude = SplineSpec::constant(0.5, 0.0, duration);
    let direct = PartialSpec::new(
        SplineSpec::new(vec![0.0, duration], vec![slope / 2.0, w0, 0.0], 2),
        amplitude.clone(),
    );
    let integrated = PartialSpec::new(
        SplineSpec::linear(0.0, duration, w0, w0 + slope * duration),
        amplitude,
    );
    (direct, integrated)
}

/// A temporary directory holding batch files.
pub struct BatchDir {
    root: TempDir,
}

impl BatchDir {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes `batch` as `<name>.json` and returns its path.
    pub fn add_batch(&self, name: &str, batch: &BatchSpec) -> PathBuf {
        let path = self.root.path().join(format!("{}.json", name));
        let json = batch.to_json_pretty().expect("Failed to serialize batch");
        fs::write(&path, json).expect("Failed to write batch file");
        path
    }

    /// Path for an output file named `name`.
    pub fn output(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

impl Default for BatchDir {
    fn default() -> Self {
        Self::new()
    }
}
