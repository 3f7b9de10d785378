//! Firmware-to-host output lines.
//!
//! The firmware emits free-form text. Three shapes are recognized:
//!
//! | Line | Meaning |
//! |------|---------|
//! | `L <row> <col> <red> [green] [blue]` | Set one square's LED |
//! | `C` | Clear all LEDs |
//! | `S` | Latch (show) the LED buffer |
//!
//! Anything else, including an `L` line with missing or non-numeric fields,
//! parses as [`DeviceLine::Other`]. Parsing never fails.

// ============================================================================
// Constants
// ============================================================================

/// Tag of an LED report line.
pub const LED_TAG: &str = "L";

/// Tag of a clear-all line.
pub const CLEAR_TAG: &str = "C";

/// Tag of a show line.
pub const SHOW_TAG: &str = "S";

// ============================================================================
// LedReport
// ============================================================================

/// One `L` line: a colour assignment for a single square.
///
/// Only row, column and red are required; the green and blue channels are
/// parsed when present and numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedReport {
    /// Matrix row.
    pub row: i32,
    /// Matrix column.
    pub col: i32,
    /// Red channel.
    pub red: i32,
    /// Green channel.
    pub green: Option<i32>,
    /// Blue channel.
    pub blue: Option<i32>,
}

// ============================================================================
// DeviceLine
// ============================================================================

/// A firmware output line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLine {
    /// LED assignment.
    Led(LedReport),
    /// Clear all LEDs.
    Clear,
    /// Show the LED buffer.
    Show,
    /// Unrecognized or malformed line.
    Other(String),
}

impl DeviceLine {
    /// Classifies a line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some(LED_TAG) => match parse_led(tokens) {
                Some(report) => Self::Led(report),
                None => Self::Other(line.to_string()),
            },
            Some(CLEAR_TAG) => Self::Clear,
            Some(SHOW_TAG) => Self::Show,
            _ => Self::Other(line.to_string()),
        }
    }

    /// Returns the LED report, if this line is one.
    #[inline]
    #[must_use]
    pub fn as_led(&self) -> Option<&LedReport> {
        match self {
            Self::Led(report) => Some(report),
            _ => None,
        }
    }
}

/// Returns the red channel of an `L` line.
///
/// Only the tag and the fourth token are inspected; row and column may be
/// anything. Returns `None` for other lines or a non-numeric red field.
#[must_use]
pub fn led_red(line: &str) -> Option<i32> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(LED_TAG) {
        return None;
    }
    tokens.nth(2)?.parse().ok()
}

/// Parses the tokens following an `L` tag.
fn parse_led<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<LedReport> {
    let row = tokens.next()?.parse().ok()?;
    let col = tokens.next()?.parse().ok()?;
    let red = tokens.next()?.parse().ok()?;
    let green = tokens.next().and_then(|t| t.parse().ok());
    let blue = tokens.next().and_then(|t| t.parse().ok());

    Some(LedReport {
        row,
        col,
        red,
        green,
        blue,
    })
}

// ============================================================================
// Tests
// ============================================================================
