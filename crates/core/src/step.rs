// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence steps
//!
//! A step is one action in a cadence: send a message, or wait. Steps are
//! read leniently (missing fields default, unknown kinds become no-ops) and
//! validated structurally at the request boundary by [`validate_steps`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// What a step does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    SendMessage,
    Wait,
    /// Unrecognized or missing kind; executes as a no-op
    #[default]
    Unknown,
}

impl StepKind {
    /// Parse a wire name, accepting the legacy `SEND_EMAIL` spelling
    pub fn parse(name: &str) -> Self {
        match name {
            "SEND_MESSAGE" | "SEND_EMAIL" => StepKind::SendMessage,
            "WAIT" => StepKind::Wait,
            _ => StepKind::Unknown,
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepKind::SendMessage => "SEND_MESSAGE",
            StepKind::Wait => "WAIT",
            StepKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<StepKind, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(StepKind::parse)
        .unwrap_or_default())
}

/// One action in a cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(alias = "type", default, deserialize_with = "lenient_kind")]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
}

/// The resolved action of a step, with lenient defaults applied
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    SendMessage { subject: String, body: String },
    /// `None` when the step waits for zero (or a negative) duration
    Wait { duration: Option<Duration> },
    Noop,
}

impl Step {
    /// A send-message step
    pub fn send(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::SendMessage,
            subject: Some(subject.into()),
            body: Some(body.into()),
            seconds: None,
        }
    }

    /// A wait step
    pub fn wait(id: impl Into<String>, seconds: f64) -> Self {
        Self {
            id: id.into(),
            kind: StepKind::Wait,
            subject: None,
            body: None,
            seconds: Some(seconds),
        }
    }

    /// Resolve the action this step performs
    pub fn action(&self) -> StepAction {
        match self.kind {
            StepKind::SendMessage => StepAction::SendMessage {
                subject: self.subject.clone().unwrap_or_default(),
                body: self.body.clone().unwrap_or_default(),
            },
            StepKind::Wait => StepAction::Wait {
                duration: wait_duration(self.seconds.unwrap_or(0.0)),
            },
            StepKind::Unknown => StepAction::Noop,
        }
    }
}

fn wait_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}

/// Structural problems with a step list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("step at position {index} has an empty id")]
    EmptyId { index: usize },
    #[error("duplicate step id: {id}")]
    DuplicateId { id: String },
    #[error("step {id} has a non-finite wait duration")]
    InvalidSeconds { id: String },
}

/// Validate a step list at the request boundary
///
/// Step ids key idempotency, so they must be present and unique within a list.
/// Unknown kinds are accepted and run as no-ops.
pub fn validate_steps(steps: &[Step]) -> Result<(), StepError> {
    let mut seen = HashSet::new();
    for (index, step) in steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(StepError::EmptyId { index });
        }
        if !seen.insert(step.id.as_str()) {
            return Err(StepError::DuplicateId {
                id: step.id.clone(),
            });
        }
        if step.seconds.is_some_and(|s| !s.is_finite()) {
            return Err(StepError::InvalidSeconds {
                id: step.id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
