//! Unified error hierarchy for lactrs
//!
//! Every failure path inside the engine resolves to one of these typed errors.
//! The protocol boundary turns them into `{status: "error", message}` values so
//! callers never see a panic.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all lactrs operations
#[derive(Debug, Error)]
pub enum LactrsError {
    /// Stage data does not match the selected protocol
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Fitted curve geometry is undefined
    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),

    /// Model parameter or config file problems
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stage import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Serialization errors at the boundary
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input-shape errors
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    /// Fewer stages than the protocol requires
    #[error("{protocol} protocol requires at least {required} stages, got {actual}")]
    TooFewStages {
        protocol: String,
        required: usize,
        actual: usize,
    },

    /// Hybrid protocol needs an exact stage count
    #[error("{protocol} protocol requires exactly {required} stages, got {actual}")]
    WrongStageCount {
        protocol: String,
        required: usize,
        actual: usize,
    },

    /// More stages than the defensive cap allows
    #[error("Too many stages: {actual} exceeds the limit of {limit}")]
    TooManyStages { actual: usize, limit: usize },

    /// Parallel sequences with different lengths
    #[error("Mismatched series lengths: speeds={speeds}, lactates={lactates}, heart_rates={heart_rates}")]
    MismatchedLengths {
        speeds: usize,
        lactates: usize,
        heart_rates: usize,
    },

    /// A single value outside its physiological domain
    #[error("Invalid {field} at stage {stage}: {value}")]
    InvalidValue {
        field: String,
        stage: usize,
        value: f64,
    },

    /// Request omitted a field with no default
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Biometric parameter outside its domain
    #[error("Invalid parameter {parameter}: {value}")]
    InvalidParameter { parameter: String, value: f64 },
}

/// Degenerate-curve errors
#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    /// Dmax chord has zero length
    #[error("Degenerate curve: chord between baseline and endpoint has zero length")]
    ZeroLengthChord,

    /// Not enough distinct speeds to fit a curve
    #[error("Cannot fit {series} curve from {points} distinct points")]
    InsufficientPoints { series: String, points: usize },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// TOML syntax or schema problems
    #[error("Invalid TOML: {0}")]
    Parse(String),

    /// Values that parse but make no sense
    #[error("Invalid model parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Export failure
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Result type alias for lactrs operations
pub type Result<T> = std::result::Result<T, LactrsError>;

impl LactrsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LactrsError::Input(_) => ErrorSeverity::Warning,
            LactrsError::Curve(_) => ErrorSeverity::Warning,
            LactrsError::Import(_) => ErrorSeverity::Warning,
            LactrsError::Configuration(_) => ErrorSeverity::Error,
            LactrsError::Io(_) => ErrorSeverity::Error,
            LactrsError::Serialization(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LactrsError::Input(InputError::TooFewStages { required, actual, .. }) => {
                format!(
                    "Not enough stages to analyze: {} recorded, at least {} needed.",
                    actual, required
                )
            }
            LactrsError::Curve(CurveError::ZeroLengthChord) => {
                "The lactate curve is flat; no threshold can be located.".to_string()
            }
            LactrsError::Input(e) => e.to_string(),
            LactrsError::Curve(e) => e.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Bad input; the caller can correct and retry
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = LactrsError::Input(InputError::TooFewStages {
            protocol: "run".to_string(),
            required: 4,
            actual: 2,
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);

        let err = LactrsError::Configuration(ConfigError::Parse("bad".to_string()));
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_user_messages() {
        let err = LactrsError::Input(InputError::TooFewStages {
            protocol: "run".to_string(),
            required: 4,
            actual: 3,
        });
        assert!(err.user_message().contains("at least 4"));

        let err = LactrsError::Curve(CurveError::ZeroLengthChord);
        assert!(err.user_message().contains("flat"));
    }

    #[test]
    fn test_display_includes_context() {
        let err = InputError::InvalidValue {
            field: "lactate".to_string(),
            stage: 2,
            value: -1.0,
        };
        assert_eq!(err.to_string(), "Invalid lactate at stage 2: -1");
    }
}
