// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence definition commands

use super::read_json;
use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};
use cadence_core::Cadence;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum CadenceCommand {
    /// Store a cadence from a JSON file (`-` reads stdin)
    Create {
        /// Path to the cadence JSON
        file: PathBuf,
    },
    /// Show a cadence definition
    Get {
        /// Cadence id
        id: String,
    },
    /// Replace a cadence definition; running enrollments are unaffected
    Update {
        /// Cadence id
        id: String,
        /// Path to the cadence JSON
        file: PathBuf,
    },
}

pub async fn handle(
    command: CadenceCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let cadence = match command {
        CadenceCommand::Create { file } => {
            let cadence: Cadence = read_json(&file)?;
            client.create_cadence(cadence).await?
        }
        CadenceCommand::Get { id } => client.get_cadence(&id).await?,
        CadenceCommand::Update { id, file } => {
            let cadence: Cadence = read_json(&file)?;
            client.update_cadence(&id, cadence).await?
        }
    };
    output::print(&cadence, format, output::cadence_text);
    Ok(())
}
