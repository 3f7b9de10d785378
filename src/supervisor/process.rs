//! Firmware-under-test subprocess.
//!
//! Owns the child handle, drains its stdout/stderr into `tracing`, and makes
//! sure the process does not outlive the harness.

// ============================================================================
// Imports
// ============================================================================

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::config::HarnessConfig;

// ============================================================================
// FirmwareProcess
// ============================================================================

/// Guards the firmware child process and kills it when dropped.
pub struct FirmwareProcess {
    /// The child process handle.
    child: Option<Child>,
    /// Process ID for logging.
    pid: u32,
}

impl FirmwareProcess {
    /// Spawns the firmware with captured stdio.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessLaunchFailed`] if the process fails to spawn.
    pub fn spawn(config: &HarnessConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.firmware);
        cmd.args(&config.firmware_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(Error::process_launch_failed)?;
        let pid = child.id().unwrap_or(0);

        // Drained continuously so a chatty firmware never blocks on a full pipe.
        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, pid, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, pid, "stderr");
        }

        info!(pid, path = %config.firmware.display(), "Firmware launched");

        Ok(Self {
            child: Some(child),
            pid,
        })
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns `true` while the process has not been reaped.
    #[must_use]
    pub fn is_running(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }

    /// Asks the process to exit, killing it if it ignores the request.
    ///
    /// On unix the request is `SIGTERM`; elsewhere the process is killed
    /// straight away.
    pub async fn terminate(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Ok(Some(status)) = child.try_wait() {
            info!(pid = self.pid, %status, "Firmware already exited");
            return;
        }

        request_exit(&mut child, self.pid);

        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => info!(pid = self.pid, %status, "Firmware terminated"),
            Ok(Err(e)) => debug!(pid = self.pid, error = %e, "Failed to wait for firmware"),
            Err(_) => {
                warn!(pid = self.pid, ?grace, "Firmware ignored termination, killing");
                if let Err(e) = child.kill().await {
                    debug!(pid = self.pid, error = %e, "Failed to kill firmware");
                }
            }
        }
    }
}

impl Drop for FirmwareProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Sends the platform's polite stop request.
#[cfg(unix)]
fn request_exit(child: &mut Child, pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        let _ = child.start_kill();
        return;
    };

    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM failed, killing");
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child, pid: u32) {
    if let Err(e) = child.start_kill() {
        debug!(pid, error = %e, "Failed to kill firmware");
    }
}

/// Forwards each line of a firmware output stream to `tracing`.
fn forward_output<R>(stream: R, pid: u32, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    debug!(target: "board_harness::firmware", pid, stream = name, "{line}");
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(pid, stream = name, error = %e, "Firmware output closed");
                    break;
                }
            }
        }
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let config = HarnessConfig::new("/nonexistent/FirmwareHost");
        let err = FirmwareProcess::spawn(&config).err().expect("spawn should fail");
        assert!(matches!(err, Error::ProcessLaunchFailed { .. }));
    }

    #[tokio::test]
    async fn test_terminate_running_process() {
        let mut config = HarnessConfig::new("/bin/sleep");
        config.firmware_args = vec!["30".to_string()];

        let mut process = FirmwareProcess::spawn(&config).expect("spawn");
        assert!(process.pid() > 0);
        assert!(process.is_running());

        process.terminate(Duration::from_secs(2)).await;
        assert!(!process.is_running());

        // Second call is a no-op.
        process.terminate(Duration::from_secs(2)).await;
    }

    #[tokio::test]
    async fn test_terminate_after_exit() {
        let mut config = HarnessConfig::new("/bin/sh");
        config.firmware_args = vec!["-c".to_string(), "echo ready".to_string()];

        let mut process = FirmwareProcess::spawn(&config).expect("spawn");
        tokio::time::sleep(Duration::from_millis(200)).await;
        process.terminate(Duration::from_millis(100)).await;
        assert!(!process.is_running());
    }
}
