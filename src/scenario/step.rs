//! Scenario steps.
//!
//! A step is one action unit. In JSON each step is an object tagged by
//! `action`, with an optional `description` used for display only:
//!
//! ```json
//! { "action": "wait_time", "ms": 500 }
//! { "action": "sensor", "row": 6, "col": 4, "state": false, "description": "lift e2 pawn" }
//! { "action": "wait_led", "command": "L" }
//! { "action": "wait_led", "color_r": 255 }
//! { "action": "expect_log", "text": "Move e2e4" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::protocol::{SensorEvent, led_red};

// ============================================================================
// LedExpectation
// ============================================================================

/// What a `wait_led` step looks for in the newest firmware line.
///
/// Either condition matching is enough. At least one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LedExpectation {
    /// Literal prefix the line must start with.
    #[serde(default)]
    pub command: Option<String>,
    /// Red channel (fourth token) an `L` line must carry.
    #[serde(default)]
    pub color_r: Option<i32>,
}

impl LedExpectation {
    /// Expects a line starting with `prefix`.
    #[must_use]
    pub fn command(prefix: impl Into<String>) -> Self {
        Self {
            command: Some(prefix.into()),
            color_r: None,
        }
    }

    /// Expects an LED report whose red channel is `red`.
    #[must_use]
    pub fn color_r(red: i32) -> Self {
        Self {
            command: None,
            color_r: Some(red),
        }
    }

    /// Returns `true` if `line` satisfies the expectation.
    ///
    /// Malformed lines never match and never fail.
    #[must_use]
    pub fn matches(&self, line: &str) -> bool {
        if let Some(prefix) = &self.command
            && line.starts_with(prefix.as_str())
        {
            return true;
        }

        if let Some(red) = self.color_r
            && led_red(line) == Some(red)
        {
            return true;
        }

        false
    }

    fn validate(&self) -> Result<(), Error> {
        match (&self.command, self.color_r) {
            (None, None) => Err(Error::invalid_scenario(
                "wait_led needs 'command' or 'color_r'",
            )),
            (Some(prefix), _) if prefix.is_empty() => Err(Error::invalid_scenario(
                "wait_led 'command' must not be empty",
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for LedExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.command, self.color_r) {
            (Some(prefix), Some(red)) => write!(f, "line starting with '{prefix}' or red={red}"),
            (Some(prefix), None) => write!(f, "line starting with '{prefix}'"),
            (None, Some(red)) => write!(f, "LED report with red={red}"),
            (None, None) => f.write_str("nothing"),
        }
    }
}

// ============================================================================
// StepAction
// ============================================================================

/// The action a step performs.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Pause the engine.
    WaitTime(Duration),
    /// Inject a sensor event.
    Sensor(SensorEvent),
    /// Wait for matching firmware output.
    WaitLed(LedExpectation),
    /// Placeholder for firmware log assertions. Never evaluated.
    ExpectLog(Map<String, Value>),
}

impl StepAction {
    /// Returns the JSON action name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WaitTime(_) => "wait_time",
            Self::Sensor(_) => "sensor",
            Self::WaitLed(_) => "wait_led",
            Self::ExpectLog(_) => "expect_log",
        }
    }
}

// ============================================================================
// Step
// ============================================================================

/// One step of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Human-readable label.
    pub description: Option<String>,
    /// What to do.
    pub action: StepAction,
}

impl Step {
    /// Creates a step without description.
    #[inline]
    #[must_use]
    pub fn new(action: StepAction) -> Self {
        Self {
            description: None,
            action,
        }
    }

    /// `wait_time` step.
    #[must_use]
    pub fn wait_time(ms: u64) -> Self {
        Self::new(StepAction::WaitTime(Duration::from_millis(ms)))
    }

    /// `sensor` step.
    #[must_use]
    pub fn sensor(row: u32, col: u32, state: bool) -> Self {
        Self::new(StepAction::Sensor(SensorEvent::new(row, col, state)))
    }

    /// `wait_led` step.
    #[must_use]
    pub fn wait_led(expectation: LedExpectation) -> Self {
        Self::new(StepAction::WaitLed(expectation))
    }

    /// `expect_log` step.
    #[must_use]
    pub fn expect_log() -> Self {
        Self::new(StepAction::ExpectLog(Map::new()))
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the description, or the action name when there is none.
    #[must_use]
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(self.action.name())
    }
}

// ============================================================================
// Deserialization
// ============================================================================

/// Step as it appears on the wire, before the action is resolved.
///
/// Resolved with `Step::try_from` after JSON decoding, so action errors
/// surface as [`Error::InvalidScenario`].
#[derive(Debug, Deserialize)]
pub(crate) struct RawStep {
    action: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    params: Map<String, Value>,
}

#[derive(Deserialize)]
struct WaitTimeParams {
    ms: u64,
}

#[derive(Deserialize)]
struct SensorParams {
    row: u32,
    col: u32,
    state: bool,
}

fn params<T: DeserializeOwned>(action: &str, params: Map<String, Value>) -> Result<T, Error> {
    serde_json::from_value(Value::Object(params))
        .map_err(|e| Error::invalid_scenario(format!("{action}: {e}")))
}

impl TryFrom<RawStep> for Step {
    type Error = Error;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let action = match raw.action.as_str() {
            "wait_time" => {
                let p: WaitTimeParams = params(&raw.action, raw.params)?;
                StepAction::WaitTime(Duration::from_millis(p.ms))
            }
            "sensor" => {
                let p: SensorParams = params(&raw.action, raw.params)?;
                StepAction::Sensor(SensorEvent::new(p.row, p.col, p.state))
            }
            "wait_led" => {
                let expectation: LedExpectation = params(&raw.action, raw.params)?;
                expectation.validate()?;
                StepAction::WaitLed(expectation)
            }
            "expect_log" => StepAction::ExpectLog(raw.params),
            other => {
                return Err(Error::invalid_scenario(format!(
                    "unknown step action '{other}'"
                )));
            }
        };

        Ok(Self {
            description: raw.description,
            action,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
