// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment state machine
//!
//! Pure transitions over [`EnrollmentState`]. The engine decides *when* to
//! apply them and persists every result before it becomes observable.
//!
//! ```text
//! RUNNING ──steps exhausted / signal past end──→ COMPLETED
//!    └──────────send failed terminally──────────→ FAILED
//! ```

use crate::cadence::CadenceSnapshot;
use crate::step::Step;
use serde::{Deserialize, Serialize};

/// Unique identifier for an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub String);

impl EnrollmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EnrollmentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EnrollmentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Running,
    Completed,
    /// A send step failed terminally
    Failed,
}

impl EnrollmentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EnrollmentStatus::Running)
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EnrollmentStatus::Running => "RUNNING",
            EnrollmentStatus::Completed => "COMPLETED",
            EnrollmentStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Events that drive an enrollment forward
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentEvent {
    /// The step at the current index finished
    StepResolved,
    /// The step list was replaced by a signal
    StepsReplaced { steps: CadenceSnapshot },
    /// The run loop found no step at the current index
    StepsExhausted,
    /// A send step failed terminally
    SendFailed { reason: String },
}

/// What the run loop should do next
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction<'a> {
    /// Terminal; nothing more will run
    Halt,
    /// Index is past the end of the list; commit completion
    Complete,
    /// Execute the step at `index`
    Run { index: usize, step: &'a Step },
}

/// One contact's live execution of a cadence snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentState {
    pub enrollment_id: EnrollmentId,
    pub contact_address: String,
    pub steps: CadenceSnapshot,
    pub current_step_index: usize,
    pub steps_version: u32,
    pub status: EnrollmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl EnrollmentState {
    /// Initial state for a new enrollment
    ///
    /// An empty snapshot completes immediately.
    pub fn start(
        enrollment_id: EnrollmentId,
        contact_address: impl Into<String>,
        steps: CadenceSnapshot,
    ) -> Self {
        let status = if steps.is_empty() {
            EnrollmentStatus::Completed
        } else {
            EnrollmentStatus::Running
        };
        Self {
            enrollment_id,
            contact_address: contact_address.into(),
            steps,
            current_step_index: 0,
            steps_version: 1,
            status,
            failure: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index)
    }

    /// Decide the next run-loop action from the committed state
    pub fn next_action(&self) -> NextAction<'_> {
        if self.is_terminal() {
            return NextAction::Halt;
        }
        match self.current_step() {
            Some(step) => NextAction::Run {
                index: self.current_step_index,
                step,
            },
            None => NextAction::Complete,
        }
    }

    /// Apply an event, returning the resulting state
    ///
    /// Terminal states absorb every event unchanged.
    pub fn transition(&self, event: &EnrollmentEvent) -> EnrollmentState {
        let mut next = self.clone();
        if self.is_terminal() {
            return next;
        }

        match event {
            EnrollmentEvent::StepResolved => {
                if self.current_step_index < self.steps.len() {
                    next.current_step_index += 1;
                }
            }

            EnrollmentEvent::StepsReplaced { steps } => {
                next.steps = steps.clone();
                next.steps_version += 1;
                // Index is kept as-is; a shorter list can complete immediately.
                if next.current_step_index >= next.steps.len() {
                    next.status = EnrollmentStatus::Completed;
                }
            }

            EnrollmentEvent::StepsExhausted => {
                if self.current_step_index >= self.steps.len() {
                    next.status = EnrollmentStatus::Completed;
                }
            }

            EnrollmentEvent::SendFailed { reason } => {
                next.status = EnrollmentStatus::Failed;
                next.failure = Some(reason.clone());
            }
        }

        next
    }
}

/// External JSON shape of an enrollment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub current_step_index: usize,
    pub steps_version: u32,
    pub status: EnrollmentStatus,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl From<&EnrollmentState> for EnrollmentView {
    fn from(state: &EnrollmentState) -> Self {
        Self {
            current_step_index: state.current_step_index,
            steps_version: state.steps_version,
            status: state.status,
            steps: state.steps.steps().to_vec(),
            failure: state.failure.clone(),
        }
    }
}

#[cfg(test)]
#[path = "enrollment_tests.rs"]
mod tests;
