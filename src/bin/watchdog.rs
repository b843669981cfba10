//! playd-watch: keeps the control service alive.
//!
//! Spawns the `playd` worker (or any command given on the command line),
//! polls its health endpoint, and restarts it on crash or unresponsiveness.
//! Stdout carries line-delimited JSON status records for an external
//! process manager; human-readable logging goes to stderr.

use std::io::Write;

use playd::config::DEFAULT_PORT;
use playd::supervisor::{ProcessError, Supervisor, SupervisorConfig};
use tracing_subscriber::EnvFilter;

/// Where the supervisor records its own unexpected faults.
const ERROR_LOG: &str = "playd-watch-error.log";

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let port = std::env::var("PLAYD_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let config = SupervisorConfig::new(
        worker_command_from_args(),
        format!("http://localhost:{port}/health"),
    );

    let supervisor = Supervisor::new(config);
    if let Err(error) = supervisor.run(shutdown_signal()).await {
        append_error_log(&error);
        std::process::exit(1);
    }
    Ok(())
}

/// Worker command: arguments after the program name, or the sibling `playd`
/// binary when none are given.
fn worker_command_from_args() -> Vec<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return args;
    }

    let sibling = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("playd")))
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| "playd".to_string());
    vec![sibling]
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn append_error_log(error: &ProcessError) {
    if let Ok(mut log) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(ERROR_LOG)
    {
        let _ = writeln!(
            log,
            "{} - {error}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
    }
}
