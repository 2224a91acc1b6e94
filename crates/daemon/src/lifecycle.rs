// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use cadence_adapters::{LoggingSender, TracedSender};
use cadence_core::{ConfigError, EngineConfig, SystemClock, UuidIdGen};
use cadence_engine::{EngineDeps, EngineError, EnrollmentSupervisor, RecoveryReport};
use cadence_storage::{FileLog, JsonCadenceStore, LogError, StoreError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Startup marker prefix the daemon writes to its log before anything else.
/// Full format: "--- cadenced: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- cadenced: starting (pid: ";

/// Supervisor with the daemon's concrete collaborators
pub type DaemonSupervisor =
    EnrollmentSupervisor<TracedSender<LoggingSender>, SystemClock, UuidIdGen>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of everything the daemon persists
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Directory of per-enrollment WAL files
    pub wal_path: PathBuf,
    /// Directory of cadence definitions
    pub cadences_path: PathBuf,
    /// Optional engine configuration
    pub config_path: PathBuf,
}

impl Config {
    /// Resolve paths from the environment
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::for_state_dir(state_dir()?);
        if let Ok(socket) = std::env::var("CADENCE_SOCKET_PATH") {
            config.socket_path = PathBuf::from(socket);
        }
        Ok(config)
    }

    /// Lay out every path under `state_dir`
    pub fn for_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket_path: state_dir.join("cadenced.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal"),
            cadences_path: state_dir.join("cadences"),
            config_path: state_dir.join("config.toml"),
            state_dir,
        }
    }

    /// Engine settings from `config.toml`, or defaults when it is absent
    pub fn engine_config(&self) -> Result<EngineConfig, LifecycleError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(EngineConfig::from_toml_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// Live enrollments
    pub supervisor: Arc<DaemonSupervisor>,
    /// Cadence definitions
    pub store: Arc<JsonCadenceStore>,
    /// What startup recovery found
    pub recovery: RecoveryReport,
    /// When daemon started
    pub start_time: Instant,
    /// Shutdown requested flag
    pub shutdown_requested: bool,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // Sequencer state is already durable; recovery resumes it on next start
        self.supervisor.shutdown().await;

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Log error: {0}")]
    Log(#[from] LogError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Recovery failed: {0}")]
    Recovery(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // The files belong to the daemon holding the lock
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    // Opened without truncation so a losing daemon leaves the pid intact
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Load config BEFORE binding socket (fail fast on a bad file)
    let engine_config = config.engine_config()?;

    // 4. Open storage
    let log = Arc::new(FileLog::open(&config.wal_path)?);
    let store = Arc::new(JsonCadenceStore::open(&config.cadences_path)?);

    // 5. Build the supervisor
    let supervisor = Arc::new(EnrollmentSupervisor::new(EngineDeps {
        sender: TracedSender::new(LoggingSender::new()),
        clock: SystemClock,
        id_gen: UuidIdGen,
        log,
        store: store.clone(),
        config: engine_config,
    }));

    // 6. Remove stale socket and bind
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 7. Resume every running enrollment (LAST)
    let recovery = supervisor.recover_all()?;
    if recovery.failed > 0 {
        warn!(
            failed = recovery.failed,
            "some enrollments could not be recovered"
        );
    }

    info!(
        state_dir = %config.state_dir.display(),
        recovered = recovery.recovered,
        finished = recovery.finished,
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        supervisor,
        store,
        recovery,
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Get the state directory for cadence
///
/// `CADENCE_STATE_DIR` wins, then `XDG_STATE_HOME`, then `~/.local/state`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("CADENCE_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("cadence"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(Path::new(&home).join(".local/state/cadence"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
