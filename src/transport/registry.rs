//! Registry of live firmware connections.
//!
//! Maps [`ConnectionId`] to [`Connection`] and tracks which one is "current",
//! the only connection the sensor injector ever writes to.
//!
//! # Selection Policy
//!
//! | Policy | New connection while one is current |
//! |--------|-------------------------------------|
//! | [`SelectionPolicy::LastWins`] | Becomes current; the old one keeps being read but never receives sends |
//! | [`SelectionPolicy::KeepFirst`] | Refused and closed |
//!
//! When the current connection goes away, no older connection is promoted.

// ============================================================================
// Imports
// ============================================================================

use std::str::FromStr;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::identifiers::ConnectionId;

use super::Connection;

// ============================================================================
// SelectionPolicy
// ============================================================================

/// How the registry picks the current connection when several arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The most recently accepted connection is current.
    #[default]
    LastWins,
    /// The first connection stays current; later ones are refused while it lives.
    KeepFirst,
}

impl FromStr for SelectionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-wins" => Ok(Self::LastWins),
            "keep-first" => Ok(Self::KeepFirst),
            other => Err(Error::config(format!(
                "Unknown selection policy '{other}' (expected 'last-wins' or 'keep-first')"
            ))),
        }
    }
}

// ============================================================================
// Admission
// ============================================================================

/// Result of offering a new connection to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored and now current.
    Current,
    /// Rejected by the policy; the caller must close it.
    Refused,
}

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Map plus current selection, updated together under one lock.
#[derive(Default)]
struct RegistryState {
    connections: FxHashMap<ConnectionId, Connection>,
    current: Option<ConnectionId>,
}

/// Thread-safe registry of accepted connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    policy: SelectionPolicy,
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Creates an empty registry with the given policy.
    #[must_use]
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Returns the selection policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Offers a freshly accepted connection.
    pub fn admit(&self, connection: Connection) -> Admission {
        let id = connection.id();
        let mut state = self.state.write();

        match (self.policy, state.current) {
            (SelectionPolicy::KeepFirst, Some(current)) => {
                warn!(conn = %id, current = %current, "Refusing connection, one is already current");
                Admission::Refused
            }
            (_, previous) => {
                state.connections.insert(id, connection);
                state.current = Some(id);
                if let Some(previous) = previous {
                    info!(conn = %id, superseded = %previous, "New connection replaces current target");
                } else {
                    debug!(conn = %id, "Connection is now current");
                }
                Admission::Current
            }
        }
    }

    /// Removes a connection. Clears the current selection if it was current.
    pub fn remove(&self, id: ConnectionId) -> Option<Connection> {
        let mut state = self.state.write();
        let removed = state.connections.remove(&id);

        if state.current == Some(id) {
            state.current = None;
            debug!(conn = %id, "Current connection removed");
        }

        removed
    }

    /// Returns the current connection, if any.
    #[must_use]
    pub fn current(&self) -> Option<Connection> {
        let state = self.state.read();
        state
            .current
            .and_then(|id| state.connections.get(&id))
            .cloned()
    }

    /// Returns the id of the current connection, if any.
    #[inline]
    #[must_use]
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.state.read().current
    }

    /// Returns the number of registered connections, superseded ones included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().connections.len()
    }

    /// Returns `true` if no connection is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().connections.is_empty()
    }

    /// Removes every connection, current one first.
    pub fn drain(&self) -> Vec<Connection> {
        let mut state = self.state.write();
        let current = state.current.take();

        let mut drained: Vec<Connection> = state.connections.drain().map(|(_, c)| c).collect();
        drained.sort_by_key(|c| (Some(c.id()) != current, c.id()));
        drained
    }
}

// ============================================================================
// Tests
// ============================================================================
