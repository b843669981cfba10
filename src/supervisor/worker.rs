//! Worker process lifecycle.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};

use super::ProcessError;

/// One spawned worker. Replaced, never mutated, on every restart.
pub struct WorkerProcess {
    child: Child,
    started_at: Instant,
}

impl WorkerProcess {
    /// Spawn the worker with stdout and stderr appended to the worker log.
    pub fn spawn(command: &[String], log_path: &Path) -> Result<Self, ProcessError> {
        let (program, args) = command.split_first().ok_or(ProcessError::EmptyCommand)?;

        let mut log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        writeln!(
            log,
            "\n--- worker start at {} ---",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        let stdout = log.try_clone()?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(log))
            .spawn()?;

        Ok(Self {
            child,
            started_at: Instant::now(),
        })
    }

    /// OS pid, while the process is live.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// True while the process has not exited.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Stop the worker: graceful signal first, forceful kill once `grace`
    /// runs out.
    pub async fn stop(mut self, grace: Duration) {
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return; // already exited
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                match tokio::time::timeout(grace, self.child.wait()).await {
                    Ok(_) => return,
                    Err(_) => tracing::warn!("worker ignored SIGTERM; killing"),
                }
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        if let Err(error) = self.child.kill().await {
            tracing::warn!("failed to kill worker: {error}");
        }
    }
}
