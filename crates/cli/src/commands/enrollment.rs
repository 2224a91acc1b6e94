// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment commands

use super::read_json;
use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};
use cadence_core::Step;
use clap::Subcommand;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum EnrollmentCommand {
    /// Show an enrollment's state
    Get {
        /// Enrollment id
        id: String,
    },
    /// Replace the steps of a running enrollment
    Update {
        /// Enrollment id
        id: String,
        /// Path to a JSON step list, or an object with a `steps` field
        file: PathBuf,
    },
}

/// Step lists are accepted bare or wrapped in `{"steps": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum StepsDocument {
    Bare(Vec<Step>),
    Wrapped { steps: Vec<Step> },
}

impl StepsDocument {
    pub(crate) fn into_steps(self) -> Vec<Step> {
        match self {
            StepsDocument::Bare(steps) | StepsDocument::Wrapped { steps } => steps,
        }
    }
}

/// Start an enrollment and print its id
pub async fn enroll(
    client: &DaemonClient,
    cadence_id: &str,
    contact_email: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let enrollment_id = client.enroll(cadence_id, contact_email).await?;
    output::print(
        &serde_json::json!({ "enrollmentId": enrollment_id }),
        format,
        |_| enrollment_id.clone(),
    );
    Ok(())
}

pub async fn handle(
    command: EnrollmentCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        EnrollmentCommand::Get { id } => {
            let view = client.get_enrollment(&id).await?;
            output::print(&view, format, output::enrollment_text);
        }
        EnrollmentCommand::Update { id, file } => {
            let steps = read_json::<StepsDocument>(&file)?.into_steps();
            client.update_enrollment(&id, steps).await?;
            output::print(&serde_json::json!({ "success": true }), format, |_| {
                format!("Updated enrollment {}", id)
            });
        }
    }
    Ok(())
}
