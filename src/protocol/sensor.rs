//! Host-to-firmware sensor events.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Leading tag of a sensor event line.
pub const SENSOR_TAG: char = 'E';

// ============================================================================
// SensorEvent
// ============================================================================

/// A synthetic sensor transition on the board matrix.
///
/// Encodes as `E <row> <col> <0|1>`; the line codec appends the newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorEvent {
    /// Matrix row.
    pub row: u32,
    /// Matrix column.
    pub col: u32,
    /// `true` when a piece is present on the square.
    pub occupied: bool,
}

impl SensorEvent {
    /// Creates a new sensor event.
    #[inline]
    #[must_use]
    pub const fn new(row: u32, col: u32, occupied: bool) -> Self {
        Self { row, col, occupied }
    }

    /// Returns the wire line without its terminating newline.
    #[inline]
    #[must_use]
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SensorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SENSOR_TAG} {} {} {}",
            self.row,
            self.col,
            u8::from(self.occupied)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_encode_pressed() {
        assert_eq!(SensorEvent::new(0, 0, true).to_line(), "E 0 0 1");
    }

    #[test]
    fn test_encode_released() {
        assert_eq!(SensorEvent::new(6, 4, false).to_line(), "E 6 4 0");
    }

    proptest! {
        #[test]
        fn prop_encoding_shape(row in 0u32..64, col in 0u32..64, occupied in any::<bool>()) {
            let line = SensorEvent::new(row, col, occupied).to_line();
            let parts: Vec<&str> = line.split(' ').collect();

            prop_assert_eq!(parts.len(), 4);
            prop_assert_eq!(parts[0], "E");
            prop_assert_eq!(parts[1].parse::<u32>().unwrap(), row);
            prop_assert_eq!(parts[2].parse::<u32>().unwrap(), col);
            prop_assert_eq!(parts[3], if occupied { "1" } else { "0" });
            prop_assert!(!line.contains('\n'));
        }
    }
}
