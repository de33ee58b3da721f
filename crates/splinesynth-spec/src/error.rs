//! Fault taxonomy, per-instance error records, and host-side validation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-instance fault codes written into the batch error-code array.
///
/// The integer values are stable; `0` in the error-code array means no fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultCode {
    /// 1: Requested synthesis function id is not recognized.
    UndefinedFn,
    /// 2: Spline coefficient count exceeds the compiled-in maximum.
    SplineTooLarge,
    /// 3: Partial count exceeds the compiled-in maximum.
    TooManyPartials,
    /// 4: Knot count exceeds the compiled-in maximum.
    TooManyKnotsInSpline,
    /// 5: A NaN was encountered.
    Nan,
    /// 6: A knot/segment lookup or buffer region failed to stay in bounds.
    IndexOutOfRange,
    /// 7: A precondition was violated.
    IllegalValue,
}

impl FaultCode {
    /// Returns the integer code stored in the error-code array.
    pub fn code(self) -> i32 {
        match self {
            FaultCode::UndefinedFn => 1,
            FaultCode::SplineTooLarge => 2,
            FaultCode::TooManyPartials => 3,
            FaultCode::TooManyKnotsInSpline => 4,
            FaultCode::Nan => 5,
            FaultCode::IndexOutOfRange => 6,
            FaultCode::IllegalValue => 7,
        }
    }

    /// Decodes an integer code. `0` and unknown values yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(FaultCode::UndefinedFn),
            2 => Some(FaultCode::SplineTooLarge),
            3 => Some(FaultCode::TooManyPartials),
            4 => Some(FaultCode::TooManyKnotsInSpline),
            5 => Some(FaultCode::Nan),
            6 => Some(FaultCode::IndexOutOfRange),
            7 => Some(FaultCode::IllegalValue),
            _ => None,
        }
    }

    /// Upper-case name as used in reports.
    pub fn name(self) -> &'static str {
        match self {
            FaultCode::UndefinedFn => "UNDEFINED_FN",
            FaultCode::SplineTooLarge => "SPLINE_TOO_LARGE",
            FaultCode::TooManyPartials => "TOO_MANY_PARTIALS",
            FaultCode::TooManyKnotsInSpline => "TOO_MANY_KNOTS_IN_SPLINE",
            FaultCode::Nan => "NAN",
            FaultCode::IndexOutOfRange => "INDEX_OUT_OF_RANGE",
            FaultCode::IllegalValue => "ILLEGAL_VALUE",
        }
    }
}

impl std::fmt::Display for FaultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Evaluation stage that detected a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Instance header checks before any spline data is touched.
    Dispatch,
    /// Copying spline data into scratch storage.
    Staging,
    /// Evaluating a partial's phase spline.
    PhaseSpline,
    /// Evaluating a partial's amplitude spline.
    AmplitudeSpline,
    /// Accumulating the partial sum into the output.
    Oscillator,
}

impl Location {
    /// Integer tag written next to the error code.
    pub fn tag(self) -> i32 {
        match self {
            Location::Dispatch => 1,
            Location::Staging => 2,
            Location::PhaseSpline => 3,
            Location::AmplitudeSpline => 4,
            Location::Oscillator => 5,
        }
    }

    /// Decodes a location tag. `0` and unknown values yield `None`.
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            1 => Some(Location::Dispatch),
            2 => Some(Location::Staging),
            3 => Some(Location::PhaseSpline),
            4 => Some(Location::AmplitudeSpline),
            5 => Some(Location::Oscillator),
            _ => None,
        }
    }

    /// Snake-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Dispatch => "dispatch",
            Location::Staging => "staging",
            Location::PhaseSpline => "phase_spline",
            Location::AmplitudeSpline => "amplitude_spline",
            Location::Oscillator => "oscillator",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic payload attached to a fault.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaultDetail {
    /// Offending partial, when the fault belongs to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<u16>,
    /// Offending index (sample index, count, or array position).
    pub index: i64,
    /// Offending value, widened to f64.
    pub value: f64,
}

impl FaultDetail {
    /// Detail carrying only an index.
    pub fn index(index: i64) -> Self {
        Self {
            partial: None,
            index,
            value: 0.0,
        }
    }

    /// Detail carrying an index and a value.
    pub fn at(index: i64, value: f64) -> Self {
        Self {
            partial: None,
            index,
            value,
        }
    }

    /// Attaches the partial the fault belongs to.
    pub fn for_partial(mut self, partial: usize) -> Self {
        self.partial = u16::try_from(partial).ok();
        self
    }
}

/// One instance's error slot as read back by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Integer fault code; `0` means no fault.
    pub code: i32,
    /// Location tag of the detecting stage; `0` when there is no fault.
    pub location: i32,
    /// Diagnostic payload.
    pub detail: FaultDetail,
}

impl ErrorRecord {
    /// The empty (no fault) record.
    pub const CLEAR: ErrorRecord = ErrorRecord {
        code: 0,
        location: 0,
        detail: FaultDetail {
            partial: None,
            index: 0,
            value: 0.0,
        },
    };

    /// Builds a populated record.
    pub fn new(code: FaultCode, location: Location, detail: FaultDetail) -> Self {
        Self {
            code: code.code(),
            location: location.tag(),
            detail,
        }
    }

    /// Returns true if a fault was recorded.
    pub fn is_fault(&self) -> bool {
        self.code != 0
    }

    /// Decoded fault code.
    pub fn fault(&self) -> Option<FaultCode> {
        FaultCode::from_code(self.code)
    }
}

/// Errors found while validating a batch description on the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The batch has more instances than the kernel supports.
    #[error("batch has {count} instances, maximum is {max}")]
    TooManyInstances {
        /// Instance count.
        count: usize,
        /// Compiled-in maximum.
        max: usize,
    },

    /// An instance has more partials than the kernel evaluates.
    #[error("instance {instance} has {count} partials, maximum is {max}")]
    TooManyPartials {
        /// Instance index.
        instance: usize,
        /// Partial count.
        count: usize,
        /// Compiled-in maximum.
        max: usize,
    },

    /// A spline is malformed or exceeds a limit.
    #[error("{path}: {message}")]
    Spline {
        /// Location of the spline, e.g. `instances[2].partials[0].phase`.
        path: String,
        /// Fault the kernel raises for it.
        fault: FaultCode,
        /// What is wrong with it.
        message: String,
    },

    /// The batch requests a synthesis function the kernel does not implement.
    #[error("undefined synthesis function id {id}")]
    UndefinedFunction {
        /// Requested function id.
        id: u32,
    },

    /// The kernel configuration is unusable.
    #[error("config: {message}")]
    Config {
        /// What is wrong with it.
        message: String,
    },

    /// An instance parameter is out of range.
    #[error("instances[{instance}].{field}: {message}")]
    Instance {
        /// Instance index.
        instance: usize,
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl ValidationError {
    /// Stable code string, following the `V0xx` scheme used in reports.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::TooManyInstances { .. } => "V001",
            ValidationError::TooManyPartials { .. } => "V002",
            ValidationError::Spline { .. } => "V003",
            ValidationError::Instance { .. } => "V004",
            ValidationError::UndefinedFunction { .. } => "V005",
            ValidationError::Config { .. } => "V006",
        }
    }

    /// The kernel fault this validation error would cause at launch time.
    pub fn fault(&self) -> FaultCode {
        match self {
            ValidationError::TooManyInstances { .. } => FaultCode::IndexOutOfRange,
            ValidationError::TooManyPartials { .. } => FaultCode::TooManyPartials,
            ValidationError::Spline { fault, .. } => *fault,
            ValidationError::Instance { .. } => FaultCode::IllegalValue,
            ValidationError::UndefinedFunction { .. } => FaultCode::UndefinedFn,
            ValidationError::Config { .. } => FaultCode::IllegalValue,
        }
    }

    /// Creates a spline error.
    pub fn spline(path: impl Into<String>, fault: FaultCode, message: impl Into<String>) -> Self {
        Self::Spline {
            path: path.into(),
            fault,
            message: message.into(),
        }
    }
}

/// Result of validating a batch description.
pub type ValidationResult = Result<(), Vec<ValidationError>>;
