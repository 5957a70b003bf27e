//! Unified error handling for the run-tracker library.
//!
//! Filter rejections are routine noise and never show up here. This module
//! covers the two things that can actually fail: the position source, and
//! the caller's configuration or plumbing around a session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure reported by (or on behalf of) the position source.
///
/// This is a closed taxonomy. Anything the platform reports that does not map
/// onto one of the first three variants is passed through as [`SourceError::Source`]
/// with the platform message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceError {
    /// No location capability on this device/runtime
    NoSource,
    /// The user or OS declined access to location
    PermissionDenied,
    /// No fix arrived within the source's configured window
    Timeout,
    /// Any other platform failure
    #[serde(rename = "SOURCE_ERROR")]
    Source(String),
}

impl SourceError {
    /// Stable code for UI/diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            SourceError::NoSource => "NO_SOURCE",
            SourceError::PermissionDenied => "PERMISSION_DENIED",
            SourceError::Timeout => "TIMEOUT",
            SourceError::Source(_) => "SOURCE_ERROR",
        }
    }

    /// Human readable message.
    pub fn message(&self) -> &str {
        match self {
            SourceError::NoSource => "location is not available on this device",
            SourceError::PermissionDenied => "location permission denied",
            SourceError::Timeout => "timed out waiting for a location fix",
            SourceError::Source(message) => message,
        }
    }

    /// Map a platform geolocation error code onto the taxonomy.
    ///
    /// Platform codes follow the W3C geolocation convention:
    /// 1 = permission denied, 2 = position unavailable, 3 = timeout.
    pub fn from_platform_code(code: u16, message: &str) -> Self {
        match code {
            1 => SourceError::PermissionDenied,
            3 => SourceError::Timeout,
            2 if message.is_empty() => SourceError::Source("position unavailable".to_string()),
            _ if message.is_empty() => {
                SourceError::Source(format!("location error (code {})", code))
            }
            _ => SourceError::Source(message.to_string()),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for SourceError {}

/// Unified error type for run-tracker operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// Position source failure
    Source(SourceError),
    /// Invalid run configuration
    ConfigError { message: String },
    /// The session actor has shut down and no longer accepts commands
    SessionClosed,
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Source(err) => write!(f, "Position source error: {}", err),
            RunError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            RunError::SessionClosed => write!(f, "Run session is closed"),
            RunError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for RunError {
    fn from(err: SourceError) -> Self {
        RunError::Source(err)
    }
}

impl From<serde_json::Error> for RunError {
    fn from(err: serde_json::Error) -> Self {
        RunError::ConfigError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for run-tracker operations.
pub type Result<T> = std::result::Result<T, RunError>;

/// Extension trait for converting Option to RunError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a configuration error.
    fn ok_or_config(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: &str) -> Result<T> {
        self.ok_or_else(|| RunError::ConfigError {
            message: message.to_string(),
        })
    }
}
