//! Outcomes of steps, scenarios and whole runs.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

// ============================================================================
// StepOutcome
// ============================================================================

/// Result of executing one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did what it should.
    Passed,
    /// The step's assertion did not hold; the scenario stops here.
    Failed {
        /// Why.
        reason: String,
    },
    /// The step was deliberately not evaluated. Neither pass nor fail.
    NotEvaluated {
        /// Why.
        reason: String,
    },
}

impl StepOutcome {
    /// Creates a failed outcome.
    #[inline]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Creates a not-evaluated outcome.
    #[inline]
    pub fn not_evaluated(reason: impl Into<String>) -> Self {
        Self::NotEvaluated {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`StepOutcome::Failed`].
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Overall result of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every step passed.
    Pass,
    /// A step failed.
    Fail,
    /// Nothing failed, but at least one step was not evaluated.
    Partial,
}

impl Verdict {
    /// Folds step outcomes into a verdict.
    #[must_use]
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a StepOutcome>) -> Self {
        let mut verdict = Self::Pass;
        for outcome in outcomes {
            match outcome {
                StepOutcome::Failed { .. } => return Self::Fail,
                StepOutcome::NotEvaluated { .. } => verdict = Self::Partial,
                StepOutcome::Passed => {}
            }
        }
        verdict
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Partial => "PARTIAL",
        })
    }
}

// ============================================================================
// StepReport / ScenarioReport
// ============================================================================

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Zero-based position in the scenario.
    pub index: usize,
    /// Description or action name.
    pub label: String,
    /// What happened.
    pub outcome: StepOutcome,
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Overall verdict.
    pub verdict: Verdict,
    /// Steps that ran, in order.
    pub steps: Vec<StepReport>,
    /// Steps not run because an earlier one failed.
    pub skipped: usize,
    /// Wall time spent on the scenario.
    pub elapsed: Duration,
}

impl ScenarioReport {
    /// Returns the first failed step, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.outcome.is_failed())
    }
}

// ============================================================================
// RunReport
// ============================================================================

/// Results of every scenario in a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Per-scenario results.
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    fn count(&self, verdict: Verdict) -> usize {
        self.scenarios.iter().filter(|s| s.verdict == verdict).count()
    }

    /// Number of passed scenarios.
    #[inline]
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(Verdict::Pass)
    }

    /// Number of failed scenarios.
    #[inline]
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Verdict::Fail)
    }

    /// Number of partial scenarios.
    #[inline]
    #[must_use]
    pub fn partial(&self) -> usize {
        self.count(Verdict::Partial)
    }

    /// Returns `true` if no scenario failed.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
