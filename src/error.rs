use thiserror::Error;

/// Failures that can come out of calibration or profile persistence.
///
/// "No sample" is not an error here: sources report it as `None`.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Calibration step '{step}' timed out")]
    Timeout { step: &'static str },

    #[error("Calibration step '{step}' captured {got} samples, need {need}")]
    InsufficientSamples {
        step: &'static str,
        got: usize,
        need: usize,
    },

    #[error("Calibration rejected: error {error:.1} exceeds limit {limit:.1}")]
    Rejected { error: f64, limit: f64 },

    #[error("Affine fit matrix is near-singular (det={det:e})")]
    SingularFit { det: f64 },

    #[error("Stored profile is corrupt: {0}")]
    ProfileCorrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize profile: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl CalibrationError {
    /// Short status text for a display that has room for one word.
    pub fn short_label(&self) -> &'static str {
        match self {
            CalibrationError::Timeout { .. } | CalibrationError::InsufficientSamples { .. } => {
                "timeout"
            }
            CalibrationError::Rejected { .. } => "rejected",
            CalibrationError::SingularFit { .. } => "singular",
            CalibrationError::ProfileCorrupt(_) => "corrupt",
            CalibrationError::Io(_) | CalibrationError::Serialize(_) => "io",
        }
    }
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;
