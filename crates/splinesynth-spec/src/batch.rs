//! Partials, instances, and batches as described by the host.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::spline::SplineSpec;

/// Function id of the additive spline oscillator.
pub const FN_OSCILLATOR: u32 = 1;

/// Default sample rate written into new batches.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

fn default_function() -> u32 {
    FN_OSCILLATOR
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

/// One sinusoidal component: `amplitude(t) * cos(phase(t))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSpec {
    /// Phase spline in radians, or angular frequency in rad/s when the batch
    /// uses integrated phase.
    pub phase: SplineSpec,
    /// Amplitude spline.
    pub amplitude: SplineSpec,
    /// Phase at the first knot, used only by integrated phase.
    #[serde(default)]
    pub phase_offset: f64,
}

impl PartialSpec {
    /// Creates a partial from a phase spline and an amplitude spline.
    pub fn new(phase: SplineSpec, amplitude: SplineSpec) -> Self {
        Self {
            phase,
            amplitude,
            phase_offset: 0.0,
        }
    }

    /// Sets the integration start phase.
    pub fn with_phase_offset(mut self, phase_offset: f64) -> Self {
        self.phase_offset = phase_offset;
        self
    }

    /// A partial for integrated phase, built from a frequency spline in
    /// cycles/s. The spline is rescaled to rad/s.
    pub fn from_frequency(frequency_hz: &SplineSpec, amplitude: SplineSpec, phase_offset: f64) -> Self {
        Self {
            phase: frequency_hz.scaled(TAU),
            amplitude,
            phase_offset,
        }
    }

    /// A fixed-frequency partial over `[0, t_end]` with direct phase
    /// `2*pi*freq_hz*t` and the given amplitude spline.
    pub fn steady(freq_hz: f64, amplitude: SplineSpec, t_end: f64) -> Self {
        Self::new(SplineSpec::linear(0.0, t_end, 0.0, TAU * freq_hz * t_end), amplitude)
    }
}

/// One independent synthesis task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Time origin in seconds.
    pub t0: f64,
    /// Sample interval in seconds.
    pub dt: f64,
    /// First sample index (inclusive).
    pub j1: usize,
    /// Last sample index (exclusive).
    pub j2: usize,
    /// Additive components.
    pub partials: Vec<PartialSpec>,
}

impl InstanceSpec {
    /// An instance covering `duration` seconds from `t = 0` at `sample_rate`.
    pub fn at_rate(sample_rate: u32, duration: f64, partials: Vec<PartialSpec>) -> Self {
        let rate = f64::from(sample_rate.max(1));
        Self {
            t0: 0.0,
            dt: 1.0 / rate,
            j1: 0,
            j2: (duration * rate).round().max(0.0) as usize,
            partials,
        }
    }

    /// Number of samples this instance writes.
    pub fn sample_count(&self) -> usize {
        self.j2.saturating_sub(self.j1)
    }

    /// Time of sample `j`.
    pub fn time_at(&self, j: usize) -> f64 {
        self.t0 + j as f64 * self.dt
    }
}

/// A batch of mutually independent instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    /// Synthesis function id; see [`FN_OSCILLATOR`].
    #[serde(default = "default_function")]
    pub function: u32,
    /// Sample rate used when writing output files.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Kernel behaviour.
    #[serde(default)]
    pub config: KernelConfig,
    /// The instances.
    pub instances: Vec<InstanceSpec>,
}

impl BatchSpec {
    /// An oscillator batch with the default config.
    pub fn new(instances: Vec<InstanceSpec>) -> Self {
        Self {
            function: FN_OSCILLATOR,
            sample_rate: DEFAULT_SAMPLE_RATE,
            config: KernelConfig::default(),
            instances,
        }
    }

    /// Replaces the config.
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the output sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Parses a batch from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the batch as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Size of the flat output buffer: the sum of all sample ranges,
    /// saturating at `usize::MAX`.
    pub fn total_samples(&self) -> usize {
        self.instances
            .iter()
            .fold(0usize, |acc, i| acc.saturating_add(i.sample_count()))
    }
}
