// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence definitions and snapshots

use crate::step::{validate_steps, Step, StepError};
use serde::{Deserialize, Serialize};

/// A named, ordered sequence of steps defining an outreach flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Cadence {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps,
        }
    }

    /// Copy the current steps for a new enrollment
    pub fn snapshot(&self) -> CadenceSnapshot {
        CadenceSnapshot::new(self.steps.clone())
    }

    pub fn validate(&self) -> Result<(), StepError> {
        validate_steps(&self.steps)
    }
}

/// Steps captured by value when an enrollment starts
///
/// Holds no reference back to the definition it was taken from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CadenceSnapshot(Vec<Step>);

impl CadenceSnapshot {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Step>> for CadenceSnapshot {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}
