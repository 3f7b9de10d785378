//! Line protocol between the harness and the firmware.
//!
//! ASCII text, one message per `\n`-terminated line.
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | [`SensorEvent`] | Host → Firmware | `E <row> <col> <0\|1>` |
//! | [`DeviceLine`] | Firmware → Host | `L r c red green blue`, `C`, `S`, free text |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Newline framing for tokio streams |
//! | `device` | Classification of firmware output |
//! | `sensor` | Sensor event encoding |

// ============================================================================
// Submodules
// ============================================================================

/// Newline-delimited framing.
pub mod codec;

/// Firmware output line parser.
pub mod device;

/// Sensor event encoding.
pub mod sensor;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::LineCodec;
pub use device::{DeviceLine, LedReport, led_red};
pub use sensor::SensorEvent;
