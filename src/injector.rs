//! Sensor event injection.
//!
//! Writes synthetic sensor transitions to the current firmware connection.
//! Fire-and-forget: nothing is acknowledged, reactions show up later in the
//! command log.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::protocol::SensorEvent;
use crate::transport::ConnectionRegistry;

// ============================================================================
// SensorInjector
// ============================================================================

/// Sends [`SensorEvent`]s to whichever connection the registry marks current.
#[derive(Clone)]
pub struct SensorInjector {
    registry: Arc<ConnectionRegistry>,
}

impl SensorInjector {
    /// Creates an injector over a connection registry.
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Queues one event for the current connection.
    ///
    /// Returns `true` if the event was handed to a live connection. With no
    /// current connection, or a connection that just closed, the event is
    /// dropped and `false` is returned; this never errors.
    pub fn inject(&self, event: SensorEvent) -> bool {
        let Some(connection) = self.registry.current() else {
            debug!(%event, "No current connection, sensor event dropped");
            return false;
        };

        match connection.send_line(event.to_line()) {
            Ok(()) => {
                info!(conn = %connection.id(), %event, "Sensor event sent");
                true
            }
            Err(e) => {
                warn!(conn = %connection.id(), %event, error = %e, "Sensor event dropped");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
