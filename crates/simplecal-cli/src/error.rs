//! CLI error types.

use std::fmt;

use simplecal_core::TracingError;
use simplecal_google::CalendarError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// OAuth or Calendar API error.
    Calendar(CalendarError),
    /// IO error.
    Io(std::io::Error),
    /// Output could not be encoded.
    Json(serde_json::Error),
    /// Logging setup failed.
    Tracing(TracingError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Calendar(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Json(err) => write!(f, "JSON error: {}", err),
            Self::Tracing(err) => write!(f, "logging setup failed: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Calendar(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Tracing(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl CliError {
    /// The provider's error body, when there is one.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Calendar(err) => err.payload(),
            _ => None,
        }
    }
}

impl From<CalendarError> for CliError {
    fn from(err: CalendarError) -> Self {
        Self::Calendar(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<TracingError> for CliError {
    fn from(err: TracingError) -> Self {
        Self::Tracing(err)
    }
}
