//! Watchdog for the control service worker process.
//!
//! The supervisor treats the worker as an opaque subprocess: it spawns it,
//! waits on it, and probes its `/health` endpoint over HTTP. No state is
//! shared across the process boundary, so a supervisor fault never corrupts
//! the worker and a worker crash is survivable by construction.
//!
//! State machine over a single worker slot:
//!
//! ```text
//! Stopped -> Starting -> Running -> Restarting -> Starting -> ...
//!                    \-> failed start (backoff) -> Starting -> ...
//! ```
//!
//! `Stopped` is reached terminally only on an explicit shutdown signal.

pub mod probe;
pub mod worker;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use probe::HealthProbe;
use worker::WorkerProcess;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("worker command is empty")]
    EmptyCommand,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Status record emitted as one JSON object per stdout line, for an
/// external process manager to observe.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SupervisorStatus {
    pub status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Starting,
    Running,
    FailedToStart,
    Restarting,
    Error,
}

impl SupervisorStatus {
    pub fn new(status: StatusKind) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(status: StatusKind, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

/// Tunables for the supervision loop. Production uses the defaults; tests
/// shrink the intervals.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Worker command line: program followed by its arguments.
    pub worker_command: Vec<String>,
    /// Health endpoint of the worker.
    pub health_url: String,
    /// Append-only log receiving the worker's stdout and stderr.
    pub worker_log: PathBuf,
    /// Probe cadence while the worker is running.
    pub poll_interval: Duration,
    /// Request timeout for a single health probe.
    pub probe_timeout: Duration,
    /// How many probes to attempt while the worker is starting.
    pub startup_probe_attempts: u32,
    /// Delay between startup probes.
    pub startup_probe_interval: Duration,
    /// Delay before the next start attempt after a failed start.
    pub failed_start_backoff: Duration,
    /// How long to wait after a graceful stop signal before killing.
    pub shutdown_grace: Duration,
}

impl SupervisorConfig {
    pub fn new(worker_command: Vec<String>, health_url: impl Into<String>) -> Self {
        Self {
            worker_command,
            health_url: health_url.into(),
            worker_log: PathBuf::from("playd-worker.log"),
            poll_interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(2),
            startup_probe_attempts: 10,
            startup_probe_interval: Duration::from_secs(1),
            failed_start_backoff: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// The watchdog itself: one worker slot, replaced wholesale on every
/// restart.
pub struct Supervisor {
    config: SupervisorConfig,
    probe: HealthProbe,
    worker: Option<WorkerProcess>,
    status_tx: Option<mpsc::UnboundedSender<SupervisorStatus>>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let probe = HealthProbe::new(config.health_url.clone(), config.probe_timeout);
        Self {
            config,
            probe,
            worker: None,
            status_tx: None,
        }
    }

    /// Mirror status records onto a channel. Tests observe the loop here;
    /// stdout emission is unaffected.
    pub fn with_status_channel(mut self, tx: mpsc::UnboundedSender<SupervisorStatus>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    /// Run the supervision loop until `shutdown` resolves.
    ///
    /// The signal is honored mid-cycle too, so a shutdown during a slow
    /// failing start does not wait out the remaining startup probes. Any
    /// live worker is stopped before this returns. An `Err` means the loop
    /// itself hit an unrecoverable fault (e.g. the worker binary cannot be
    /// spawned at all).
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), ProcessError> {
        tokio::pin!(shutdown);
        self.emit(SupervisorStatus::new(StatusKind::Starting));

        loop {
            let result = tokio::select! {
                _ = &mut shutdown => break,
                result = self.step() => result,
            };
            let wait = match result {
                Ok(wait) => wait,
                Err(error) => {
                    self.emit(SupervisorStatus::with_message(
                        StatusKind::Error,
                        error.to_string(),
                    ));
                    if let Some(worker) = self.worker.take() {
                        worker.stop(self.config.shutdown_grace).await;
                    }
                    return Err(error);
                }
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        tracing::info!("shutdown requested; stopping worker");
        if let Some(worker) = self.worker.take() {
            worker.stop(self.config.shutdown_grace).await;
        }
        Ok(())
    }

    /// One supervision cycle. Returns how long to sleep before the next.
    async fn step(&mut self) -> Result<Duration, ProcessError> {
        let alive = match self.worker.as_mut() {
            Some(worker) => worker.is_running(),
            None => false,
        };

        if alive && self.probe.check().await {
            return Ok(self.config.poll_interval);
        }

        // The old worker is fully stopped before a replacement is spawned.
        if let Some(worker) = self.worker.take() {
            if alive {
                self.emit(SupervisorStatus::new(StatusKind::Restarting));
            }
            tracing::info!(uptime = ?worker.uptime(), "stopping worker");
            worker.stop(self.config.shutdown_grace).await;
        }

        if self.start_worker().await? {
            let message = match self.worker.as_ref().and_then(|w| w.id()) {
                Some(pid) => format!("worker pid {pid}"),
                None => "worker running".to_string(),
            };
            self.emit(SupervisorStatus::with_message(StatusKind::Running, message));
            Ok(self.config.poll_interval)
        } else {
            if let Some(worker) = self.worker.take() {
                worker.stop(self.config.shutdown_grace).await;
            }
            self.emit(SupervisorStatus::with_message(
                StatusKind::FailedToStart,
                "health probe never succeeded",
            ));
            Ok(self.config.failed_start_backoff)
        }
    }

    /// Spawn a worker and poll its health endpoint until it answers or the
    /// startup attempts run out.
    async fn start_worker(&mut self) -> Result<bool, ProcessError> {
        let worker = WorkerProcess::spawn(&self.config.worker_command, &self.config.worker_log)?;
        tracing::info!(pid = ?worker.id(), "spawned worker");
        self.worker = Some(worker);

        for _ in 0..self.config.startup_probe_attempts {
            if self.probe.check().await {
                return Ok(true);
            }
            tokio::time::sleep(self.config.startup_probe_interval).await;
        }
        Ok(false)
    }

    fn emit(&self, status: SupervisorStatus) {
        if let Ok(line) = serde_json::to_string(&status) {
            println!("{line}");
        }
        if let Some(tx) = &self.status_tx {
            let _ = tx.send(status);
        }
    }
}
