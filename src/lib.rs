//! Board Harness - hardware-in-the-loop test harness for sensor/LED firmware.
//!
//! Runs scripted scenarios against a host build of the board firmware. The
//! firmware connects over TCP, the harness injects sensor events and watches
//! the LED commands that come back.
//!
//! # Architecture
//!
//! The harness is the server; the firmware is the client:
//!
//! - **Harness (Rust)**: Listens, injects `E` lines, records every line received
//! - **Firmware**: Connects, reads sensor events, emits `L`/`C`/`S` LED commands
//!
//! Key design principles:
//!
//! - One newline-terminated ASCII line per message in both directions
//! - Every received line lands in an append-only [`CommandLog`]
//! - Exactly one connection is *current* and receives injected events
//! - LED waits are woken by log appends, with a poll interval as backstop
//!
//! # Quick Start
//!
//! ```no_run
//! use board_harness::{Result, Supervisor, load_scenarios};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scenarios = load_scenarios("scenarios.json")?;
//!
//!     let supervisor = Supervisor::builder()
//!         .firmware("../build/firmware_host/FirmwareHost")
//!         .build()?;
//!
//!     let report = supervisor.run(&scenarios).await?;
//!     for scenario in &report.scenarios {
//!         println!("{}: {}", scenario.name, scenario.verdict);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`command_log`] | Ordered record of received lines |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`injector`] | Sensor event injection |
//! | [`protocol`] | Line protocol codec and message types |
//! | [`scenario`] | Scenario model, loader and engine |
//! | [`supervisor`] | Firmware process supervision |
//! | [`transport`] | TCP listener and connection management |

// ============================================================================
// Modules
// ============================================================================

/// Ordered record of lines received from the firmware.
pub mod command_log;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Sensor event injection into the current connection.
pub mod injector;

/// Line protocol codec and message types.
pub mod protocol;

/// Scenario model, loader and engine.
///
/// Use [`load_scenarios()`] to read a scenario file and
/// [`ScenarioEngine`] to execute it.
pub mod scenario;

/// Firmware process supervision.
///
/// Use [`Supervisor::builder()`] to configure a harness run.
pub mod supervisor;

/// TCP transport layer.
///
/// Listener, per-connection event loops and the current-connection registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Core types
pub use command_log::CommandLog;
pub use injector::SensorInjector;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;

// Protocol types
pub use protocol::{DeviceLine, LedReport, LineCodec, SensorEvent};

// Scenario types
pub use scenario::{
    EngineTiming, LedExpectation, RunReport, Scenario, ScenarioEngine, ScenarioReport, Step,
    StepAction, StepOutcome, StepReport, Verdict, load_scenarios, parse_scenarios,
};

// Supervisor types
pub use supervisor::{FirmwareProcess, HarnessConfig, Supervisor, SupervisorBuilder};

// Transport types
pub use transport::{Connection, ConnectionRegistry, Listener, ListenerConfig, SelectionPolicy};
