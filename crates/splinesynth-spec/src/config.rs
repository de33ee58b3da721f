//! Kernel configuration carried alongside a batch.

use serde::{Deserialize, Serialize};

/// How a partial's phase is produced from its phase spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseMode {
    /// The phase spline is evaluated directly at each sample time.
    #[default]
    Direct,
    /// The phase spline holds angular frequency in rad/s. It is integrated
    /// analytically at staging time, starting from the partial's phase offset
    /// at the first knot.
    IntegratedOmega,
}

/// What the evaluator does with a query outside `[knots[0], knots[n-1]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extrapolation {
    /// The first and last segment polynomials extend to -inf and +inf.
    #[default]
    Extrapolate,
    /// Out-of-domain queries fail with `INDEX_OUT_OF_RANGE`.
    Reject,
}

/// How many workers process one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionModel {
    /// One worker stages and synthesizes the whole instance.
    #[default]
    Single,
    /// A group of workers shares one staging buffer and splits the sample range.
    Group {
        /// Workers per instance.
        workers: usize,
    },
}

impl ExecutionModel {
    /// Number of workers per instance (at least one).
    pub fn workers(self) -> usize {
        match self {
            ExecutionModel::Single => 1,
            ExecutionModel::Group { workers } => workers.max(1),
        }
    }
}

/// Numeric precision of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Single precision, for production throughput.
    Reduced,
    /// Double precision, for validation.
    Full,
}

impl Precision {
    /// Parses `reduced`/`f32` or `full`/`f64`.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "reduced" | "f32" => Some(Precision::Reduced),
            "full" | "f64" => Some(Precision::Full),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Reduced => "reduced",
            Precision::Full => "full",
        }
    }
}

/// Kernel behaviour switches. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Phase-generation strategy.
    pub phase_mode: PhaseMode,
    /// Out-of-domain query policy.
    pub extrapolation: Extrapolation,
    /// Workers per instance.
    pub execution: ExecutionModel,
    /// Process instances concurrently. `false` runs them in order on the caller's thread.
    pub parallel: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            phase_mode: PhaseMode::Direct,
            extrapolation: Extrapolation::Extrapolate,
            execution: ExecutionModel::Single,
            parallel: true,
        }
    }
}

impl KernelConfig {
    /// Sets the phase mode.
    pub fn phase_mode(mut self, phase_mode: PhaseMode) -> Self {
        self.phase_mode = phase_mode;
        self
    }

    /// Sets the out-of-domain policy.
    pub fn extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Sets the execution model.
    pub fn execution(mut self, execution: ExecutionModel) -> Self {
        self.execution = execution;
        self
    }

    /// Enables or disables concurrent instance processing.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
