//! Error types for AMP training.

use std::fmt;
use std::io;

use crate::checkpoint::CheckpointError;

/// Result type for AMP training operations.
pub type Result<T> = std::result::Result<T, AmpError>;

/// Errors that abort a training run.
///
/// Nothing in the crate retries or degrades on error: every variant is
/// propagated up to [`AmpOnPolicyRunner::learn`](crate::AmpOnPolicyRunner::learn).
#[derive(Debug)]
pub enum AmpError {
    /// A buffer or tensor does not have the shape its contract requires.
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// Invalid or unsupported configuration.
    Config(ConfigError),
    /// Checkpoint write/read failure.
    Checkpoint(CheckpointError),
    /// IO error outside of checkpointing (log files).
    Io(io::Error),
}

/// Configuration validation error.
///
/// Returned when configuration parameters are invalid or inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter must be positive.
    InvalidCount {
        field: &'static str,
        value: usize,
    },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// A name outside the closed set of supported variants.
    UnknownVariant {
        field: &'static str,
        value: String,
    },
    /// The logging backend exists but has no transport in this build.
    BackendUnavailable {
        backend: String,
    },
    /// Malformed or incomplete configuration document.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::UnknownVariant { field, value } => {
                write!(f, "unknown {} '{}'", field, value)
            }
            ConfigError::BackendUnavailable { backend } => {
                write!(f, "logger '{}' is not available in this build", backend)
            }
            ConfigError::Parse(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AmpError {
    /// Shape mismatch for flat buffers where only the element count is known.
    pub fn len_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected: vec![expected],
            actual: vec![actual],
        }
    }
}

impl fmt::Display for AmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { what, expected, actual } => {
                write!(f, "Shape mismatch for {}: expected {:?}, got {:?}", what, expected, actual)
            }
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Checkpoint(e) => write!(f, "Checkpoint error: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AmpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Checkpoint(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for AmpError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CheckpointError> for AmpError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

impl From<io::Error> for AmpError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Check that a flat buffer holds exactly `rows * cols` values.
pub(crate) fn ensure_len(what: &'static str, data: &[impl Sized], rows: usize, cols: usize) -> Result<()> {
    if data.len() != rows * cols {
        return Err(AmpError::ShapeMismatch {
            what,
            expected: vec![rows, cols],
            actual: vec![data.len()],
        });
    }
    Ok(())
}
