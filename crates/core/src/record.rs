// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable records: the committed history of an enrollment
//!
//! Every committed transition is one record carrying the full resulting state,
//! so the latest record alone is enough to answer queries. The pending-action
//! marker tells recovery what the enrollment was suspended on.

use crate::enrollment::{EnrollmentId, EnrollmentState};
use crate::message::{IdempotencyKey, OutboundMessage, SendReceipt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The action an enrollment was suspended on when the record was committed
///
/// The marker carries everything needed to finish the action, so a signal
/// that replaces the step at `step_index` does not change what resumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingAction {
    /// Timer armed; fires at an absolute deadline
    #[serde(rename_all = "camelCase")]
    Wait {
        step_index: usize,
        step_id: String,
        deadline: DateTime<Utc>,
    },
    /// Side effect dispatched but not yet confirmed
    #[serde(rename_all = "camelCase")]
    Send {
        step_index: usize,
        step_id: String,
        idempotency_key: IdempotencyKey,
        message: OutboundMessage,
    },
}

impl PendingAction {
    pub fn step_id(&self) -> &str {
        match self {
            PendingAction::Wait { step_id, .. } | PendingAction::Send { step_id, .. } => step_id,
        }
    }

    /// Position of the step that was in flight
    pub fn step_index(&self) -> usize {
        match self {
            PendingAction::Wait { step_index, .. } | PendingAction::Send { step_index, .. } => {
                *step_index
            }
        }
    }
}

/// What a record commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Started,
    WaitArmed,
    SendDispatched,
    #[serde(rename_all = "camelCase")]
    SendResolved {
        idempotency_key: IdempotencyKey,
        receipt: SendReceipt,
    },
    /// An in-flight send finished with an error after the enrollment had
    /// already reached a terminal status
    #[serde(rename_all = "camelCase")]
    SendAbandoned {
        idempotency_key: IdempotencyKey,
        reason: String,
    },
    StepAdvanced,
    StepsReplaced,
    Completed,
    Failed {
        reason: String,
    },
}

impl Transition {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Started => "started",
            Transition::WaitArmed => "wait_armed",
            Transition::SendDispatched => "send_dispatched",
            Transition::SendResolved { .. } => "send_resolved",
            Transition::SendAbandoned { .. } => "send_abandoned",
            Transition::StepAdvanced => "step_advanced",
            Transition::StepsReplaced => "steps_replaced",
            Transition::Completed => "completed",
            Transition::Failed { .. } => "failed",
        }
    }
}

/// One committed transition of one enrollment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableRecord {
    pub enrollment_id: EnrollmentId,
    /// Per-enrollment sequence number, starting at 0, without gaps
    pub sequence: u64,
    pub state: EnrollmentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingAction>,
    pub transition: Transition,
}

impl DurableRecord {
    /// Idempotency key resolved by this record, if any
    pub fn resolved_key(&self) -> Option<&IdempotencyKey> {
        match &self.transition {
            Transition::SendResolved {
                idempotency_key, ..
            } => Some(idempotency_key),
            _ => None,
        }
    }
}
