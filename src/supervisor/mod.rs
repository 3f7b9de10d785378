//! Firmware process supervision.
//!
//! This module provides the main entry point for a harness run.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Supervisor`] | Runs scenarios against a launched firmware |
//! | [`SupervisorBuilder`] | Fluent configuration builder |
//! | [`HarnessConfig`] | Validated run configuration |
//! | [`FirmwareProcess`] | Child process guard |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for supervisor configuration.
pub mod builder;

/// Run configuration.
pub mod config;

/// Core supervisor implementation.
pub mod core;

/// Firmware subprocess handling.
pub mod process;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SupervisorBuilder;
pub use config::HarnessConfig;
pub use core::Supervisor;
pub use process::FirmwareProcess;
