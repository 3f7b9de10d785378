//! Harness run coordinator.
//!
//! The [`Supervisor`] owns a run end to end: bind the listener, launch the
//! firmware, give it time to connect, run the scenarios, tear both down.
//!
//! # Example
//!
//! ```no_run
//! use board_harness::{Supervisor, load_scenarios};
//!
//! # async fn example() -> board_harness::Result<()> {
//! let scenarios = load_scenarios("scenarios.json")?;
//! let supervisor = Supervisor::builder()
//!     .firmware("../build/firmware_host/FirmwareHost")
//!     .build()?;
//!
//! let report = supervisor.run(&scenarios).await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::command_log::CommandLog;
use crate::error::{Error, Result};
use crate::scenario::{RunReport, Scenario, ScenarioEngine};
use crate::transport::Listener;

use super::builder::SupervisorBuilder;
use super::config::HarnessConfig;
use super::process::FirmwareProcess;

// ============================================================================
// Supervisor
// ============================================================================

/// Launches the firmware-under-test and drives scenarios against it.
pub struct Supervisor {
    config: HarnessConfig,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("firmware", &self.config.firmware)
            .field("listen", &self.config.listener.socket_addr())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Supervisor - Public API
// ============================================================================

impl Supervisor {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Returns the run configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs every scenario against a freshly launched firmware.
    ///
    /// Scenario failures are reported in the returned [`RunReport`], not as
    /// errors.
    ///
    /// # Errors
    ///
    /// - [`Error::FirmwareNotFound`] if the firmware vanished since `build()`
    /// - [`Error::Connection`] if the listener cannot bind
    /// - [`Error::ProcessLaunchFailed`] if the firmware fails to start
    pub async fn run(&self, scenarios: &[Scenario]) -> Result<RunReport> {
        if !self.config.firmware.exists() {
            return Err(Error::firmware_not_found(&self.config.firmware));
        }

        let log = Arc::new(CommandLog::new());
        let listener = Listener::bind(self.config.listener, log).await?;

        let mut firmware = match FirmwareProcess::spawn(&self.config) {
            Ok(process) => process,
            Err(e) => {
                listener.stop().await;
                return Err(e);
            }
        };

        info!(settle = ?self.config.settle_delay, "Waiting for firmware to connect");
        sleep(self.config.settle_delay).await;

        match listener.current() {
            Some(conn) => info!(%conn, "Firmware connection ready"),
            None => warn!(
                addr = %listener.local_addr(),
                "Firmware has not connected, sensor events will be dropped"
            ),
        }

        let engine = ScenarioEngine::for_listener(&listener, self.config.timing);
        let report = engine.run_all(scenarios).await;

        firmware.terminate(self.config.shutdown_grace).await;
        listener.stop().await;

        Ok(report)
    }
}

// ============================================================================
// Supervisor - Internal API
// ============================================================================

impl Supervisor {
    /// Creates a supervisor from a validated configuration.
    pub(crate) fn new(config: HarnessConfig) -> Self {
        Self { config }
    }
}

// ============================================================================
// Tests
// ============================================================================
