//! Ordered log of lines received from the firmware.
//!
//! Connection handlers append, the scenario engine inspects the newest line
//! or clears the log. Every operation takes the single lock for exactly one
//! logical step, so an append is never partially visible.
//!
//! Appends also wake any task parked in [`CommandLog::notified`], which lets
//! `wait_led` react to new output without waiting for its next poll tick.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

// ============================================================================
// CommandLog
// ============================================================================

/// Thread-safe, order-preserving buffer of firmware output lines.
///
/// The sequence is only ever mutated by [`append`](Self::append) or
/// [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct CommandLog {
    /// Lines in emission order.
    lines: Mutex<Vec<String>>,
    /// Woken after every append.
    appended: Notify,
}

impl CommandLog {
    /// Creates an empty log.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line to the tail.
    pub fn append(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
        self.appended.notify_waiters();
    }

    /// Returns the most recently appended line without removing it.
    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }

    /// Empties the log. A no-op on an empty log.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    /// Returns the number of buffered lines.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Returns `true` if no lines are buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Returns a copy of every buffered line, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Returns a future that resolves on the next append.
    ///
    /// The future observes appends from the moment it is created, even before
    /// it is first polled. Create it before inspecting the log to avoid
    /// missing a line that lands in between.
    #[inline]
    pub fn notified(&self) -> Notified<'_> {
        self.appended.notified()
    }
}

// ============================================================================
// Tests
// ============================================================================
