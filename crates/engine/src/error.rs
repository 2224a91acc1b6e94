// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the execution engine

use cadence_core::{EnrollmentId, StepError};
use cadence_storage::{LogError, StoreError};
use thiserror::Error;

/// Errors surfaced by the supervisor and sequencers
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cadence not found: {0}")]
    CadenceNotFound(String),
    #[error("enrollment not found: {0}")]
    EnrollmentNotFound(EnrollmentId),
    #[error("enrollment {0} is stalled on the durability log; resume it to continue")]
    Stalled(EnrollmentId),
    #[error("invalid steps: {0}")]
    InvalidSteps(#[from] StepError),
    #[error("durability log failed for {enrollment_id}: {source}")]
    Durability {
        enrollment_id: EnrollmentId,
        #[source]
        source: LogError,
    },
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Whether the error means "no such thing" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::CadenceNotFound(_) | EngineError::EnrollmentNotFound(_)
        )
    }
}
