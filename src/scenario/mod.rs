//! Scenarios: named, ordered step lists, and the engine that runs them.
//!
//! Scenarios are loaded once at startup from a JSON document:
//!
//! ```json
//! [
//!   {
//!     "name": "Lift piece lights square",
//!     "steps": [
//!       { "action": "sensor", "row": 0, "col": 0, "state": true },
//!       { "action": "wait_led", "command": "L" }
//!     ]
//!   }
//! ]
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `engine` | Sequential step execution |
//! | `report` | Step outcomes and verdicts |
//! | `step` | Step types and their JSON form |

// ============================================================================
// Submodules
// ============================================================================

/// Sequential scenario execution.
pub mod engine;

/// Step outcomes, scenario verdicts and run reports.
pub mod report;

/// Step definitions.
pub mod step;

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

use self::step::RawStep;

// ============================================================================
// Re-exports
// ============================================================================

pub use engine::{EngineTiming, ScenarioEngine};
pub use report::{RunReport, ScenarioReport, StepOutcome, StepReport, Verdict};
pub use step::{LedExpectation, Step, StepAction};

// ============================================================================
// Scenario
// ============================================================================

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Display name.
    pub name: String,
    /// Steps, executed strictly in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Creates a scenario.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// Scenario as decoded from JSON, steps not yet resolved.
#[derive(Deserialize)]
struct RawScenario {
    name: String,
    steps: Vec<RawStep>,
}

impl RawScenario {
    /// Validates the name and resolves every step.
    fn resolve(self, index: usize) -> Result<Scenario> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_scenario(format!(
                "scenario #{} has an empty name",
                index + 1
            )));
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        for (position, raw) in self.steps.into_iter().enumerate() {
            let step = Step::try_from(raw).map_err(|e| {
                let detail = match e {
                    Error::InvalidScenario { message } => message,
                    other => other.to_string(),
                };
                Error::invalid_scenario(format!(
                    "scenario '{}' step #{}: {detail}",
                    self.name,
                    position + 1
                ))
            })?;
            steps.push(step);
        }

        Ok(Scenario {
            name: self.name,
            steps,
        })
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parses a JSON array of scenarios.
///
/// # Errors
///
/// - [`Error::Json`] if the document is not a well-formed scenario array
/// - [`Error::InvalidScenario`] if a scenario has an empty name, or a step has
///   an unknown action, missing parameters or an empty `wait_led`
pub fn parse_scenarios(json: &str) -> Result<Vec<Scenario>> {
    let raw: Vec<RawScenario> = serde_json::from_str(json)?;

    let scenarios = raw
        .into_iter()
        .enumerate()
        .map(|(index, scenario)| scenario.resolve(index))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = scenarios.len(), "Scenarios parsed");
    Ok(scenarios)
}

/// Reads and parses a scenario file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as
/// [`parse_scenarios`].
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<Scenario>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), "Loading scenarios");
    parse_scenarios(&json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const DOC: &str = r#"[
        {
            "name": "Lift piece lights square",
            "steps": [
                { "action": "sensor", "row": 0, "col": 0, "state": true },
                { "action": "wait_led", "command": "L", "description": "any LED" }
            ]
        },
        {
            "name": "Placeholder",
            "steps": [ { "action": "expect_log", "text": "ready" } ]
        }
    ]"#;

    #[test]
    fn test_parse_scenarios() {
        let scenarios = parse_scenarios(DOC).expect("parse");
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "Lift piece lights square");
        assert_eq!(scenarios[0].steps[0], Step::sensor(0, 0, true));
        assert_eq!(scenarios[0].steps[1].label(), "any LED");
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        let err = parse_scenarios(r#"[{"name":"  ","steps":[]}]"#).unwrap_err();
        assert!(matches!(err, Error::InvalidScenario { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_step() {
        let err = parse_scenarios(r#"[{"name":"x","steps":[{"action":"fly"}]}]"#).unwrap_err();
        assert!(matches!(err, Error::InvalidScenario { .. }));
        assert!(err.is_preflight());
        assert!(err.to_string().contains("scenario 'x' step #1"));
    }

    #[test]
    fn test_parse_rejects_empty_wait_led() {
        let err = parse_scenarios(
            r#"[{"name":"x","steps":[{"action":"sensor","row":0,"col":0,"state":true},{"action":"wait_led"}]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidScenario { .. }));
        assert!(err.to_string().contains("step #2"));
    }

    #[test]
    fn test_parse_malformed_json_is_json_error() {
        let err = parse_scenarios("[{").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_parse_rejects_missing_steps() {
        assert!(parse_scenarios(r#"[{"name":"x"}]"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(DOC.as_bytes()).expect("write");

        let scenarios = load_scenarios(file.path()).expect("load");
        assert_eq!(scenarios.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_scenarios("/definitely/not/here/scenarios.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
