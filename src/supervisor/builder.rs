//! Builder pattern for supervisor configuration.
//!
//! Provides a fluent API for configuring and creating [`Supervisor`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use board_harness::Supervisor;
//!
//! # fn example() -> board_harness::Result<()> {
//! let supervisor = Supervisor::builder()
//!     .firmware("../build/firmware_host/FirmwareHost")
//!     .port(2323)
//!     .settle_delay(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scenario::EngineTiming;
use crate::transport::{ListenerConfig, SelectionPolicy};

use super::config::{DEFAULT_SETTLE_DELAY, DEFAULT_SHUTDOWN_GRACE, HarnessConfig};
use super::core::Supervisor;

// ============================================================================
// SupervisorBuilder
// ============================================================================

/// Builder for configuring a [`Supervisor`] instance.
///
/// Use [`Supervisor::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct SupervisorBuilder {
    /// Path to the firmware executable.
    firmware: Option<PathBuf>,
    /// Extra firmware arguments.
    firmware_args: Vec<String>,
    /// Listener address and policy.
    listener: ListenerConfig,
    /// Settle delay after launch.
    settle_delay: Duration,
    /// Grace period on shutdown.
    shutdown_grace: Duration,
    /// `wait_led` timing.
    timing: EngineTiming,
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self {
            firmware: None,
            firmware_args: Vec::new(),
            listener: ListenerConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            timing: EngineTiming::default(),
        }
    }
}

// ============================================================================
// SupervisorBuilder Implementation
// ============================================================================

impl SupervisorBuilder {
    /// Creates a new builder with default settings and no firmware.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path to the firmware executable.
    #[inline]
    #[must_use]
    pub fn firmware(mut self, path: impl Into<PathBuf>) -> Self {
        self.firmware = Some(path.into());
        self
    }

    /// Adds a firmware command-line argument.
    #[inline]
    #[must_use]
    pub fn firmware_arg(mut self, arg: impl Into<String>) -> Self {
        self.firmware_args.push(arg.into());
        self
    }

    /// Adds multiple firmware command-line arguments.
    #[inline]
    #[must_use]
    pub fn firmware_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.firmware_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the address to listen on.
    #[inline]
    #[must_use]
    pub fn host(mut self, ip: IpAddr) -> Self {
        self.listener.ip = ip;
        self
    }

    /// Sets the port to listen on (0 for ephemeral).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.listener.port = port;
        self
    }

    /// Sets the current-connection selection policy.
    #[inline]
    #[must_use]
    pub fn selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.listener.policy = policy;
        self
    }

    /// Sets the delay between firmware launch and the first scenario.
    #[inline]
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets how long the firmware may take to exit before it is killed.
    #[inline]
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Sets the `wait_led` poll interval.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.timing.poll_interval = interval;
        self
    }

    /// Sets the `wait_led` timeout.
    #[inline]
    #[must_use]
    pub fn led_timeout(mut self, timeout: Duration) -> Self {
        self.timing.led_timeout = timeout;
        self
    }

    /// Builds the supervisor with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the firmware path is not set or timing is invalid
    /// - [`Error::FirmwareNotFound`] if the firmware path doesn't exist
    pub fn build(self) -> Result<Supervisor> {
        let firmware = self.validate_firmware()?;

        let config = HarnessConfig {
            listener: self.listener,
            firmware,
            firmware_args: self.firmware_args,
            settle_delay: self.settle_delay,
            shutdown_grace: self.shutdown_grace,
            timing: self.timing,
        };
        config.validate().map_err(Error::config)?;

        Ok(Supervisor::new(config))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SupervisorBuilder {
    /// Validates the firmware path configuration.
    fn validate_firmware(&self) -> Result<PathBuf> {
        let firmware = self.firmware.clone().ok_or_else(|| {
            Error::config(
                "Firmware path is required. Use .firmware() to set it.\n\
                 Example: Supervisor::builder().firmware(\"./build/firmware_host/FirmwareHost\")",
            )
        })?;

        if !firmware.exists() {
            return Err(Error::firmware_not_found(&firmware));
        }

        Ok(firmware)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = SupervisorBuilder::new();
        assert!(builder.firmware.is_none());
        assert_eq!(builder.listener, ListenerConfig::default());
        assert_eq!(builder.settle_delay, DEFAULT_SETTLE_DELAY);
    }

    #[test]
    fn test_setters_chain() {
        let builder = SupervisorBuilder::new()
            .firmware("/bin/sh")
            .firmware_args(["-c", "true"])
            .host(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .port(0)
            .selection_policy(SelectionPolicy::KeepFirst)
            .poll_interval(Duration::from_millis(5))
            .led_timeout(Duration::from_millis(100));

        assert_eq!(builder.firmware, Some(PathBuf::from("/bin/sh")));
        assert_eq!(builder.firmware_args, vec!["-c", "true"]);
        assert_eq!(builder.listener.port, 0);
        assert_eq!(builder.listener.policy, SelectionPolicy::KeepFirst);
        assert_eq!(builder.timing.poll_interval, Duration::from_millis(5));
        assert_eq!(builder.timing.led_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_build_fails_without_firmware() {
        let err = SupervisorBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Firmware path"));
    }

    #[test]
    fn test_build_fails_with_missing_firmware() {
        let err = SupervisorBuilder::new()
            .firmware("/nonexistent/FirmwareHost")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::FirmwareNotFound { .. }));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_build_rejects_zero_poll_interval() {
        let firmware = tempfile::NamedTempFile::new().expect("tempfile");
        let err = SupervisorBuilder::new()
            .firmware(firmware.path())
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_succeeds() {
        let firmware = tempfile::NamedTempFile::new().expect("tempfile");
        let supervisor = SupervisorBuilder::new()
            .firmware(firmware.path())
            .port(0)
            .build()
            .expect("build");
        assert_eq!(supervisor.config().firmware, firmware.path());
    }
}
