// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use cadence_core::{Cadence, EnrollmentView, Step, StepAction};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format, rendering text with `text`
pub fn print<T: Serialize>(value: &T, format: OutputFormat, text: impl FnOnce(&T) -> String) {
    match format {
        OutputFormat::Text => println!("{}", text(value)),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

pub fn cadence_text(cadence: &Cadence) -> String {
    let mut out = format!("Cadence: {}\n  Name: {}\n  Steps:", cadence.id, cadence.name);
    if cadence.steps.is_empty() {
        out.push_str(" (none)");
    }
    for (index, step) in cadence.steps.iter().enumerate() {
        out.push_str(&format!("\n    {}", step_line(index, step, None)));
    }
    out
}

pub fn enrollment_text(view: &EnrollmentView) -> String {
    let mut out = format!(
        "Status: {}\n  Step: {} of {}\n  Steps version: {}",
        view.status,
        view.current_step_index,
        view.steps.len(),
        view.steps_version
    );
    if let Some(failure) = &view.failure {
        out.push_str(&format!("\n  Failure: {}", failure));
    }
    for (index, step) in view.steps.iter().enumerate() {
        out.push_str(&format!(
            "\n    {}",
            step_line(index, step, Some(view.current_step_index))
        ));
    }
    out
}

fn step_line(index: usize, step: &Step, current: Option<usize>) -> String {
    let marker = if current == Some(index) { ">" } else { " " };
    let detail = match step.action() {
        StepAction::SendMessage { subject, .. } => format!("\"{}\"", subject),
        StepAction::Wait {
            duration: Some(duration),
        } => format!("{}s", duration.as_secs_f64()),
        StepAction::Wait { duration: None } => "0s".to_string(),
        StepAction::Noop => String::new(),
    };
    format!(
        "{}{:>3}. {:<12} {:<14} {}",
        marker,
        index,
        step.id,
        step.kind.to_string(),
        detail
    )
    .trim_end()
    .to_string()
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
