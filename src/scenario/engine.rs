//! Scenario engine.
//!
//! Runs scenarios one after another and, inside each, steps one after
//! another. Nothing is reordered or run in parallel. The engine is the only
//! driving task; waits suspend it alone while the listener and connection
//! tasks keep running.
//!
//! # Step Semantics
//!
//! | Step | Behaviour |
//! |------|-----------|
//! | `wait_time` | Sleep |
//! | `sensor` | Clear the log, then inject the event |
//! | `wait_led` | Re-check the newest log line until it matches or the timeout expires |
//! | `expect_log` | Reported as not evaluated |
//!
//! A failed step skips the rest of its scenario; the next scenario still runs.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::command_log::CommandLog;
use crate::injector::SensorInjector;
use crate::transport::Listener;

use super::Scenario;
use super::report::{RunReport, ScenarioReport, StepOutcome, StepReport, Verdict};
use super::step::{LedExpectation, Step, StepAction};

// ============================================================================
// Constants
// ============================================================================

/// Default interval between `wait_led` checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default `wait_led` timeout.
pub const DEFAULT_LED_TIMEOUT: Duration = Duration::from_millis(2000);

// ============================================================================
// EngineTiming
// ============================================================================

/// Timing knobs for `wait_led`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    /// Longest gap between two checks of the log.
    pub poll_interval: Duration,
    /// How long a `wait_led` step may wait before it fails.
    pub led_timeout: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            led_timeout: DEFAULT_LED_TIMEOUT,
        }
    }
}

// ============================================================================
// ScenarioEngine
// ============================================================================

/// Executes scenarios against a live firmware connection.
pub struct ScenarioEngine {
    log: Arc<CommandLog>,
    injector: SensorInjector,
    timing: EngineTiming,
}

impl ScenarioEngine {
    /// Creates an engine over a command log and an injector.
    #[must_use]
    pub fn new(log: Arc<CommandLog>, injector: SensorInjector, timing: EngineTiming) -> Self {
        Self {
            log,
            injector,
            timing,
        }
    }

    /// Creates an engine wired to a listener's log and registry.
    #[must_use]
    pub fn for_listener(listener: &Listener, timing: EngineTiming) -> Self {
        Self::new(
            Arc::clone(listener.log()),
            SensorInjector::new(Arc::clone(listener.registry())),
            timing,
        )
    }

    /// Returns the timing configuration.
    #[inline]
    #[must_use]
    pub fn timing(&self) -> EngineTiming {
        self.timing
    }

    /// Runs every scenario in order.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> RunReport {
        let mut report = RunReport::default();

        for scenario in scenarios {
            report.scenarios.push(self.run_scenario(scenario).await);
        }

        info!(
            passed = report.passed(),
            failed = report.failed(),
            partial = report.partial(),
            "Run complete"
        );

        report
    }

    /// Runs one scenario, stopping at the first failed step.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");

        let started = Instant::now();
        self.log.clear();

        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            info!(step = index + 1, label = step.label(), "Step");

            let outcome = self.execute_step(step).await;
            let failed = outcome.is_failed();
            steps.push(StepReport {
                index,
                label: step.label().to_string(),
                outcome,
            });

            if failed {
                break;
            }
        }

        let skipped = scenario.steps.len() - steps.len();
        let verdict = Verdict::from_outcomes(steps.iter().map(|s| &s.outcome));

        match verdict {
            Verdict::Fail => warn!(scenario = %scenario.name, skipped, "=== FAIL ==="),
            other => info!(scenario = %scenario.name, "=== {other} ==="),
        }

        ScenarioReport {
            name: scenario.name.clone(),
            verdict,
            steps,
            skipped,
            elapsed: started.elapsed(),
        }
    }

    /// Executes a single step.
    pub async fn execute_step(&self, step: &Step) -> StepOutcome {
        match &step.action {
            StepAction::WaitTime(duration) => {
                sleep(*duration).await;
                StepOutcome::Passed
            }

            StepAction::Sensor(event) => {
                // Output from before the stimulus must not satisfy a later wait_led.
                self.log.clear();
                self.injector.inject(*event);
                StepOutcome::Passed
            }

            StepAction::WaitLed(expectation) => self.wait_led(expectation).await,

            StepAction::ExpectLog(_) => {
                info!("Log check not evaluated");
                StepOutcome::not_evaluated("expect_log is not implemented")
            }
        }
    }

    /// Waits for the newest log line to satisfy `expectation`.
    ///
    /// Checks at least every poll interval and additionally on every append.
    /// The log is checked once more at the deadline, so a line that lands
    /// just before expiry still passes.
    async fn wait_led(&self, expectation: &LedExpectation) -> StepOutcome {
        let deadline = Instant::now() + self.timing.led_timeout;

        loop {
            let appended = self.log.notified();

            if let Some(line) = self.log.last()
                && expectation.matches(&line)
            {
                info!(%line, "LED observed");
                return StepOutcome::Passed;
            }

            let now = Instant::now();
            if now >= deadline {
                let last = self.log.last();
                warn!(expected = %expectation, ?last, "Timeout waiting for LED command");
                return StepOutcome::failed(format!(
                    "no {expectation} within {}ms (last line: {})",
                    self.timing.led_timeout.as_millis(),
                    last.as_deref().unwrap_or("<none>")
                ));
            }

            let wait = (deadline - now).min(self.timing.poll_interval);
            tokio::select! {
                () = appended => debug!("Log appended, re-checking"),
                () = sleep(wait) => {}
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::{ConnectionRegistry, SelectionPolicy};

    fn engine(timing: EngineTiming) -> (ScenarioEngine, Arc<CommandLog>) {
        let log = Arc::new(CommandLog::new());
        let injector =
            SensorInjector::new(Arc::new(ConnectionRegistry::new(SelectionPolicy::LastWins)));
        (ScenarioEngine::new(Arc::clone(&log), injector, timing), log)
    }

    fn fast() -> EngineTiming {
        EngineTiming {
            poll_interval: Duration::from_millis(10),
            led_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_default_timing() {
        let timing = EngineTiming::default();
        assert_eq!(timing.poll_interval, Duration::from_millis(50));
        assert_eq!(timing.led_timeout, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_wait_led_prefix_match_passes() {
        let (engine, log) = engine(fast());
        log.append("L 3 4 255 0 0");

        let outcome = engine
            .execute_step(&Step::wait_led(LedExpectation::command("L")))
            .await;
        assert_eq!(outcome, StepOutcome::Passed);
    }

    #[tokio::test]
    async fn test_wait_led_color_match_passes() {
        let (engine, log) = engine(fast());
        log.append("L 3 4 255");

        let outcome = engine
            .execute_step(&Step::wait_led(LedExpectation::color_r(255)))
            .await;
        assert_eq!(outcome, StepOutcome::Passed);
    }

    #[tokio::test]
    async fn test_wait_led_color_mismatch_times_out() {
        let (engine, log) = engine(fast());
        log.append("L 3 4 10");

        let started = Instant::now();
        let outcome = engine
            .execute_step(&Step::wait_led(LedExpectation::color_r(255)))
            .await;

        assert!(outcome.is_failed());
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_wait_led_malformed_lines_are_non_matches() {
        let (engine, log) = engine(fast());
        log.append("L 3");

        let outcome = engine
            .execute_step(&Step::wait_led(LedExpectation::color_r(255)))
            .await;
        assert!(outcome.is_failed());
    }

    #[tokio::test]
    async fn test_wait_led_empty_log_times_out() {
        let (engine, _log) = engine(fast());
        let outcome = engine
            .execute_step(&Step::wait_led(LedExpectation::command("L")))
            .await;
        assert!(outcome.is_failed());
    }

    #[tokio::test]
    async fn test_wait_led_late_match_passes() {
        let timing = EngineTiming {
            poll_interval: Duration::from_millis(50),
            led_timeout: Duration::from_millis(300),
        };
        let (engine, log) = engine(timing);

        let writer = {
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                // One poll interval before expiry.
                sleep(Duration::from_millis(250)).await;
                log.append("L 0 0 255 0 0");
            })
        };

        let outcome = engine
            .execute_step(&Step::wait_led(LedExpectation::command("L")))
            .await;
        writer.await.expect("writer");
        assert_eq!(outcome, StepOutcome::Passed);
    }

    #[tokio::test]
    async fn test_expect_log_is_not_evaluated() {
        let (engine, _log) = engine(fast());
        let outcome = engine.execute_step(&Step::expect_log()).await;
        assert!(matches!(outcome, StepOutcome::NotEvaluated { .. }));
    }

    #[tokio::test]
    async fn test_sensor_without_connection_passes() {
        let (engine, log) = engine(fast());
        log.append("stale");

        let outcome = engine.execute_step(&Step::sensor(0, 0, true)).await;
        assert_eq!(outcome, StepOutcome::Passed);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_wait_time_sleeps() {
        let (engine, _log) = engine(fast());
        let started = Instant::now();
        let outcome = engine.execute_step(&Step::wait_time(30)).await;
        assert_eq!(outcome, StepOutcome::Passed);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_failed_step_skips_rest_and_next_scenario_runs() {
        let (engine, _log) = engine(fast());

        let failing = Scenario::new(
            "no firmware output",
            vec![
                Step::wait_led(LedExpectation::command("L")),
                Step::wait_time(1),
                Step::expect_log(),
            ],
        );
        let passing = Scenario::new("just wait", vec![Step::wait_time(1)]);

        let report = engine.run_all(&[failing, passing]).await;

        assert_eq!(report.scenarios.len(), 2);
        assert_eq!(report.scenarios[0].verdict, Verdict::Fail);
        assert_eq!(report.scenarios[0].steps.len(), 1);
        assert_eq!(report.scenarios[0].skipped, 2);
        assert!(report.scenarios[0].failure().is_some());
        assert_eq!(report.scenarios[1].verdict, Verdict::Pass);
    }

    #[tokio::test]
    async fn test_expect_log_makes_scenario_partial() {
        let (engine, _log) = engine(fast());
        let scenario = Scenario::new("logs", vec![Step::wait_time(1), Step::expect_log()]);

        let report = engine.run_scenario(&scenario).await;
        assert_eq!(report.verdict, Verdict::Partial);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_scenario_start_clears_stale_output() {
        let (engine, log) = engine(fast());
        log.append("L 0 0 255 0 0");

        let scenario = Scenario::new(
            "stale",
            vec![Step::wait_led(LedExpectation::command("L"))],
        );
        let report = engine.run_scenario(&scenario).await;
        assert_eq!(report.verdict, Verdict::Fail);
    }
}
