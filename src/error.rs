use chrono::NaiveDate;
use thiserror::Error;

/// Process-level error: a message plus the exit code `covx` terminates with.
///
/// Exit codes:
/// - 2: input, configuration or IO problems
/// - 3: the analysis produced no usable result
/// - 4: terminal/runtime failures
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Typed failures of the derivation and correlation routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("No data for '{country}'.")]
    EmptySeries { country: String },

    #[error("No data for '{country}' on or after {cutoff}.")]
    InvalidDateRange { country: String, cutoff: NaiveDate },

    #[error("Prevalence ratio is undefined on the first row ({date}) and has no previous value to fall back on.")]
    UndefinedInitialRatio { date: NaiveDate },

    #[error("Not enough overlapping observations: need {needed}, have {available}.")]
    InsufficientData { needed: usize, available: usize },

    #[error("Series are not aligned: {left} vs {right} observations.")]
    MisalignedSeries { left: usize, right: usize },

    #[error("Pick two different countries (both are '{country}').")]
    SameCountry { country: String },

    #[error("Unknown column '{name}'.")]
    UnknownColumn { name: String },
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::new(3, err.to_string())
    }
}
