//! TCP transport layer.
//!
//! This module handles the link between the harness (server) and the
//! firmware-under-test (client).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Harness (Rust) │                              │  Firmware host  │
//! │                 │       line protocol          │  build          │
//! │  Listener       │◄────────────────────────────►│                 │
//! │  → Connection   │      127.0.0.1:2323          │  TCP client     │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Listener::bind` - Bind and start the accept loop
//! 2. Launch the firmware pointed at the bound address
//! 3. Accept - a `Connection` task starts reading lines into the `CommandLog`
//! 4. `ConnectionRegistry` - the connection becomes current (per policy)
//! 5. `Listener::stop` - Close the socket and every connection
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-connection line event loop |
//! | `listener` | TCP listener and accept loop |
//! | `registry` | Connection map and current selection |

// ============================================================================
// Submodules
// ============================================================================

/// Per-connection event loop.
pub mod connection;

/// TCP listener for firmware connections.
pub mod listener;

/// Connection registry and selection policy.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use listener::{Listener, ListenerConfig};
pub use registry::{Admission, ConnectionRegistry, SelectionPolicy};
