//! Error types for the board harness.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use board_harness::{Result, Supervisor};
//!
//! async fn example(scenarios: &[Scenario]) -> Result<()> {
//!     let supervisor = Supervisor::builder().firmware("./FirmwareHost").build()?;
//!     let report = supervisor.run(scenarios).await?;
//!     println!("{} failed", report.failed());
//!     Ok(())
//! }
//! ```
//!
//! A `wait_led` timeout is a step outcome, not an [`Error`]: it fails the
//! scenario and the run continues.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidScenario`] |
//! | Process | [`Error::FirmwareNotFound`], [`Error::ProcessLaunchFailed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Harness configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A scenario document was well-formed JSON but not a valid scenario.
    #[error("Invalid scenario: {message}")]
    InvalidScenario {
        /// Description of the problem.
        message: String,
    },

    // ========================================================================
    // Process Errors
    // ========================================================================
    /// Firmware executable not found at path.
    ///
    /// Raised before any socket is bound or any scenario runs.
    #[error("Firmware not found at: {path}")]
    FirmwareNotFound {
        /// Path where the firmware was expected.
        path: PathBuf,
    },

    /// Failed to launch the firmware process.
    #[error("Failed to launch firmware: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection-level failure.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// No firmware connection arrived within the timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed while an operation needed it.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid scenario error.
    #[inline]
    pub fn invalid_scenario(message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            message: message.into(),
        }
    }

    /// Creates a firmware not found error.
    #[inline]
    pub fn firmware_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FirmwareNotFound { path: path.into() }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    ///
    /// Durations beyond `u64::MAX` milliseconds saturate.
    #[inline]
    pub fn connection_timeout(waited: Duration) -> Self {
        Self::ConnectionTimeout {
            timeout_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionTimeout { .. } | Self::ConnectionClosed
        )
    }

    /// Returns `true` if the error happened before the run could start.
    ///
    /// Pre-flight errors abort the whole run; nothing was bound or spawned.
    #[inline]
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidScenario { .. } | Self::FirmwareNotFound { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("peer reset");
        assert_eq!(err.to_string(), "Connection failed: peer reset");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing firmware path");
        assert_eq!(err.to_string(), "Configuration error: missing firmware path");
    }

    #[test]
    fn test_firmware_not_found_display() {
        let err = Error::firmware_not_found("/nope/FirmwareHost");
        assert_eq!(err.to_string(), "Firmware not found at: /nope/FirmwareHost");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connection_timeout(Duration::from_secs(2)).is_timeout());
        assert!(!Error::connection("test").is_timeout());
    }

    #[test]
    fn test_connection_timeout_saturates() {
        let err = Error::connection_timeout(Duration::from_millis(1500));
        assert!(matches!(err, Error::ConnectionTimeout { timeout_ms: 1500 }));

        let err = Error::connection_timeout(Duration::MAX);
        assert!(matches!(err, Error::ConnectionTimeout { timeout_ms: u64::MAX }));
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::connection_timeout(Duration::from_millis(10)).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_preflight() {
        assert!(Error::firmware_not_found("/x").is_preflight());
        assert!(Error::invalid_scenario("empty name").is_preflight());
        assert!(!Error::ConnectionClosed.is_preflight());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
