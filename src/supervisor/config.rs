//! Harness run configuration.
//!
//! One explicit value passed into the [`Supervisor`](super::Supervisor); the
//! listener and engine receive their parts of it. Nothing is read from
//! global state.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::scenario::EngineTiming;
use crate::transport::ListenerConfig;

// ============================================================================
// Constants
// ============================================================================

/// Time the firmware gets to connect before the first scenario starts.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Time the firmware gets to exit after a termination request.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// HarnessConfig
// ============================================================================

/// Everything a harness run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Where the firmware connects.
    pub listener: ListenerConfig,

    /// Firmware-under-test executable.
    pub firmware: PathBuf,

    /// Extra command-line arguments for the firmware.
    pub firmware_args: Vec<String>,

    /// Pause between launching the firmware and running scenarios.
    pub settle_delay: Duration,

    /// Wait after asking the firmware to exit before killing it.
    pub shutdown_grace: Duration,

    /// `wait_led` timing.
    pub timing: EngineTiming,
}

impl HarnessConfig {
    /// Creates a configuration with default timing for `firmware`.
    #[must_use]
    pub fn new(firmware: impl Into<PathBuf>) -> Self {
        Self {
            listener: ListenerConfig::default(),
            firmware: firmware.into(),
            firmware_args: Vec::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            timing: EngineTiming::default(),
        }
    }

    /// Validates timing values.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.timing.poll_interval.is_zero() {
            return Err("Poll interval must be greater than zero".to_string());
        }
        if self.timing.led_timeout.is_zero() {
            return Err("LED timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
