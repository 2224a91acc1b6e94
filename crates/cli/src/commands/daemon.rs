// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use crate::client::{self, ClientError, DaemonClient};
use cadence_daemon::lifecycle::Config;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon if it is not running
    Start,
    /// Stop the daemon
    Stop,
    /// Show daemon status
    Status,
}

pub async fn handle(command: DaemonCommand, config: &Config) -> anyhow::Result<()> {
    match command {
        DaemonCommand::Start => {
            let client = DaemonClient::connect_or_start(config)?;
            let version = client.hello().await?;
            println!("Daemon running (version {})", version);
        }
        DaemonCommand::Stop => {
            if client::daemon_stop(config).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }
        DaemonCommand::Status => match DaemonClient::connect(config) {
            Ok(client) => {
                let (uptime_secs, live, recovered) = client.status().await?;
                println!("Status: running");
                println!("  Uptime: {}s", uptime_secs);
                println!("  Live enrollments: {}", live);
                println!("  Recovered at startup: {}", recovered);
            }
            Err(ClientError::DaemonNotRunning) => println!("Status: not running"),
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}
