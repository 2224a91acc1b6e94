// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! cadence - command-line client for the cadence daemon

mod client;
mod commands;
mod output;

use anyhow::Result;
use cadence_daemon::lifecycle::Config;
use clap::{Parser, Subcommand};
use commands::{cadence, daemon, enrollment};
use std::path::PathBuf;

use crate::client::DaemonClient;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Cadence - durable outreach sequences"
)]
struct Cli {
    /// State directory of the daemon to talk to
    #[arg(long, global = true, env = "CADENCE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cadence definitions
    Cadence {
        #[command(subcommand)]
        command: cadence::CadenceCommand,
    },
    /// Enroll a contact in a cadence
    Enroll {
        /// Cadence id
        cadence_id: String,
        /// Contact email address
        contact_email: String,
    },
    /// Enrollment queries and updates
    Enrollment {
        #[command(subcommand)]
        command: enrollment::EnrollmentCommand,
    },
    /// Daemon management
    Daemon {
        #[command(subcommand)]
        command: daemon::DaemonCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let config = match cli.state_dir {
        Some(dir) => Config::for_state_dir(dir),
        None => Config::load()?,
    };

    // Daemon management handles connecting itself
    let command = match cli.command {
        Commands::Daemon { command } => return daemon::handle(command, &config).await,
        command => command,
    };

    let client = DaemonClient::connect_or_start(&config)?;
    tracing::debug!(socket = %config.socket_path.display(), "connected to daemon");

    match command {
        Commands::Cadence { command } => cadence::handle(command, &client, cli.output).await,
        Commands::Enroll {
            cadence_id,
            contact_email,
        } => enrollment::enroll(&client, &cadence_id, &contact_email, cli.output).await,
        Commands::Enrollment { command } => {
            enrollment::handle(command, &client, cli.output).await
        }
        Commands::Daemon { .. } => Ok(()),
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
