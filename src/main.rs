//! `board-harness` command-line entry point.
//!
//! Loads a scenario file, launches the firmware and prints a verdict per
//! scenario. Exit code 0 when nothing failed, 1 when a scenario failed,
//! 2 when the harness itself could not run.

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use board_harness::{
    RunReport, SelectionPolicy, StepOutcome, Supervisor, Verdict, load_scenarios,
};

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "board-harness")]
#[command(about = "Run scripted sensor/LED scenarios against board firmware")]
struct Args {
    /// Firmware executable to launch
    #[arg(long, env = "HARNESS_FIRMWARE", default_value = "../build/firmware_host/FirmwareHost")]
    firmware: PathBuf,

    /// Scenario file (JSON)
    #[arg(long, env = "HARNESS_SCENARIOS", default_value = "scenarios.json")]
    scenarios: PathBuf,

    /// Address to listen on
    #[arg(long, env = "HARNESS_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port the firmware connects to
    #[arg(long, env = "HARNESS_PORT", default_value_t = 2323)]
    port: u16,

    /// Delay between launching the firmware and the first scenario
    #[arg(long, default_value_t = 2000)]
    settle_ms: u64,

    /// How long a wait_led step waits for a match
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// wait_led poll interval
    #[arg(long, default_value_t = 50)]
    poll_ms: u64,

    /// Which firmware connection receives sensor events: last-wins or keep-first
    #[arg(long, env = "HARNESS_POLICY", default_value = "last-wins")]
    policy: SelectionPolicy,

    /// Shorthand for `--policy keep-first`
    #[arg(long, conflicts_with = "policy")]
    keep_first: bool,

    /// Enable debug logging (includes firmware output)
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// Resolves `--keep-first` against `--policy`.
    fn selection_policy(&self) -> SelectionPolicy {
        if self.keep_first {
            SelectionPolicy::KeepFirst
        } else {
            self.policy
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args).await {
        Ok(report) => {
            print_summary(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!(error = %e, "Harness failed");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> board_harness::Result<RunReport> {
    let scenarios = load_scenarios(&args.scenarios)?;

    let policy = args.selection_policy();
    let supervisor = Supervisor::builder()
        .firmware(args.firmware)
        .host(args.host)
        .port(args.port)
        .selection_policy(policy)
        .settle_delay(Duration::from_millis(args.settle_ms))
        .led_timeout(Duration::from_millis(args.timeout_ms))
        .poll_interval(Duration::from_millis(args.poll_ms))
        .build()?;

    supervisor.run(&scenarios).await
}

// ============================================================================
// Helpers
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let default = if debug {
        "board_harness=debug"
    } else {
        "board_harness=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_summary(report: &RunReport) {
    for scenario in &report.scenarios {
        println!(
            "[{}] {} ({} ms)",
            scenario.verdict,
            scenario.name,
            scenario.elapsed.as_millis()
        );

        for step in &scenario.steps {
            match &step.outcome {
                StepOutcome::Passed => {}
                StepOutcome::Failed { reason } => {
                    println!("    step {} ({}) failed: {reason}", step.index + 1, step.label);
                }
                StepOutcome::NotEvaluated { reason } => {
                    println!("    step {} ({}) not evaluated: {reason}", step.index + 1, step.label);
                }
            }
        }

        if scenario.verdict == Verdict::Fail && scenario.skipped > 0 {
            println!("    {} step(s) skipped", scenario.skipped);
        }
    }

    println!(
        "\n{} passed, {} failed, {} partial",
        report.passed(),
        report.failed(),
        report.partial()
    );
}

// ============================================================================
// Tests
// ============================================================================
