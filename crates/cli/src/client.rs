// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use cadence_core::{Cadence, EnrollmentView, Step};
use cadence_daemon::lifecycle::{Config, STARTUP_MARKER_PREFIX};
use cadence_daemon::protocol::{self, ProtocolError};
use cadence_daemon::{Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("CADENCE_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("CADENCE_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("CADENCE_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(2))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("CADENCE_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Daemon error: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map the daemon's failure responses onto client errors
fn failure(response: Response) -> ClientError {
    match response {
        Response::NotFound { message } => ClientError::NotFound(message),
        Response::Invalid { message } => ClientError::Invalid(message),
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start(config: &Config) -> Result<Self, ClientError> {
        match Self::connect(config) {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background(config)?;
                Self::connect_with_retry(config, timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e, config)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect(config: &Config) -> Result<Self, ClientError> {
        if !config.socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self {
            socket_path: config.socket_path.clone(),
        })
    }

    fn connect_with_retry(
        config: &Config,
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // An early exit means startup failed; the log says why
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(&config.log_path) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect(config) {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => std::thread::sleep(poll_interval()),
                Err(e) => return Err(wrap_with_startup_error(e, config)),
            }
        }

        Err(wrap_with_startup_error(
            ClientError::DaemonStartTimeout,
            config,
        ))
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let timeout = timeout_ipc();
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes = tokio::time::timeout(timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        Ok(protocol::decode(&response_bytes)?)
    }

    /// Store a new cadence definition
    pub async fn create_cadence(&self, cadence: Cadence) -> Result<Cadence, ClientError> {
        match self.send(Request::CreateCadence { cadence }).await? {
            Response::Cadence { cadence } => Ok(cadence),
            other => Err(failure(other)),
        }
    }

    /// Fetch a cadence definition
    pub async fn get_cadence(&self, id: &str) -> Result<Cadence, ClientError> {
        match self.send(Request::GetCadence { id: id.to_string() }).await? {
            Response::Cadence { cadence } => Ok(cadence),
            other => Err(failure(other)),
        }
    }

    /// Replace a cadence definition; running enrollments keep their snapshot
    pub async fn update_cadence(&self, id: &str, cadence: Cadence) -> Result<Cadence, ClientError> {
        match self
            .send(Request::UpdateCadence {
                id: id.to_string(),
                cadence,
            })
            .await?
        {
            Response::Cadence { cadence } => Ok(cadence),
            other => Err(failure(other)),
        }
    }

    /// Start a new enrollment, returning its id
    pub async fn enroll(&self, cadence_id: &str, contact_email: &str) -> Result<String, ClientError> {
        match self
            .send(Request::Enroll {
                cadence_id: cadence_id.to_string(),
                contact_email: contact_email.to_string(),
            })
            .await?
        {
            Response::Enrolled { enrollment_id } => Ok(enrollment_id),
            other => Err(failure(other)),
        }
    }

    /// Query an enrollment's state
    pub async fn get_enrollment(&self, id: &str) -> Result<EnrollmentView, ClientError> {
        match self
            .send(Request::GetEnrollment { id: id.to_string() })
            .await?
        {
            Response::Enrollment { enrollment } => Ok(enrollment),
            other => Err(failure(other)),
        }
    }

    /// Replace a running enrollment's steps
    pub async fn update_enrollment(&self, id: &str, steps: Vec<Step>) -> Result<(), ClientError> {
        match self
            .send(Request::UpdateEnrollment {
                id: id.to_string(),
                steps,
            })
            .await?
        {
            Response::Updated { success: true } => Ok(()),
            other => Err(failure(other)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<(u64, usize, usize), ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                enrollments_live,
                enrollments_recovered,
            } => Ok((uptime_secs, enrollments_live, enrollments_recovered)),
            other => Err(failure(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            other => Err(failure(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(failure(other)),
        }
    }
}

/// Start the daemon in the background, returning the child process handle
fn start_daemon_background(config: &Config) -> Result<std::process::Child, ClientError> {
    Command::new(find_daemon_binary())
        .env("CADENCE_STATE_DIR", &config.state_dir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(config: &Config) -> Result<bool, ClientError> {
    let client = match DaemonClient::connect(config) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => return Ok(false),
        Err(e) => return Err(e),
    };

    // Read before asking: the daemon removes its pid file on the way out
    let pid = read_daemon_pid(&config.lock_path);
    let shutdown_result = client.shutdown().await;

    if let Some(pid) = pid {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    } else {
        shutdown_result?;
    }

    Ok(true)
}

async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the cadenced binary
fn find_daemon_binary() -> PathBuf {
    if let Ok(path) = std::env::var("CADENCE_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("cadenced");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("cadenced")
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid(pid_path: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Check if a process with the given PID exists
fn process_exists(pid: u32) -> bool {
    kill(&["-0", &pid.to_string()])
}

fn force_kill_daemon(pid: u32) -> bool {
    kill(&["-9", &pid.to_string()])
}

fn kill(args: &[&str]) -> bool {
    Command::new("kill")
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read daemon log from the last startup marker, looking for errors.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;

    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;

    // The synchronous line and the traced line carry the same message
    content[start_pos..]
        .lines()
        .find(|line| line.contains("ERROR") && line.contains("Failed to start daemon: "))
        .and_then(|line| line.split_once("Failed to start daemon: "))
        .map(|(_, msg)| msg.trim().to_string())
}

/// Wrap an error with startup log info if available.
fn wrap_with_startup_error(err: ClientError, config: &Config) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error(&config.log_path) {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
