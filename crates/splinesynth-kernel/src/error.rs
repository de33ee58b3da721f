//! Host-side error types for the kernel crate.
//!
//! Faults inside a launch never surface here; they are recorded per instance in
//! [`splinesynth_spec::ErrorRecord`]. These errors cover what the driver does
//! around a launch: validating input and writing output files.

use splinesynth_spec::ValidationError;
use thiserror::Error;

/// Errors from the driver layer.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The batch failed host-side validation.
    #[error("batch failed validation with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    /// The mixdown timeline is longer than the driver will allocate.
    #[error("mixdown timeline ends at sample {end}, maximum is {max}")]
    Timeline {
        /// Position of the last sample.
        end: f64,
        /// [`crate::driver::MAX_MIX_SAMPLES`]
        max: usize,
    },

    /// WAV encoding failed.
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KernelError {
    /// Stable code string for reports.
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::Validation(_) => "KERNEL_001",
            KernelError::Wav(_) => "KERNEL_002",
            KernelError::Io(_) => "KERNEL_003",
            KernelError::Timeline { .. } => "KERNEL_004",
        }
    }
}

impl From<Vec<ValidationError>> for KernelError {
    fn from(errors: Vec<ValidationError>) -> Self {
        KernelError::Validation(errors)
    }
}

/// Result type for driver operations.
pub type KernelResult<T> = Result<T, KernelError>;
