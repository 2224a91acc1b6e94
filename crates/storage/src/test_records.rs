// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record builders shared by this crate's tests

use cadence_core::{
    CadenceSnapshot, DurableRecord, EnrollmentEvent, EnrollmentId, EnrollmentState, Step,
    Transition,
};

/// Sequence-0 record for a two-step enrollment
pub fn started(id: &str) -> DurableRecord {
    let enrollment_id = EnrollmentId::new(id);
    DurableRecord {
        enrollment_id: enrollment_id.clone(),
        sequence: 0,
        state: EnrollmentState::start(
            enrollment_id,
            "a@example.com",
            CadenceSnapshot::new(vec![
                Step::send("s1", "Welcome", "Hello"),
                Step::wait("w1", 10.0),
            ]),
        ),
        pending: None,
        transition: Transition::Started,
    }
}

/// The record following `prev` after one step advance
pub fn advanced(prev: &DurableRecord) -> DurableRecord {
    DurableRecord {
        enrollment_id: prev.enrollment_id.clone(),
        sequence: prev.sequence + 1,
        state: prev.state.transition(&EnrollmentEvent::StepResolved),
        pending: None,
        transition: Transition::StepAdvanced,
    }
}

/// `started` followed by `count` advances
pub fn history(id: &str, count: usize) -> Vec<DurableRecord> {
    let mut records = vec![started(id)];
    for _ in 0..count {
        let next = records.last().map(advanced);
        records.extend(next);
    }
    records
}

/// The COMPLETED record following `prev`, which must be past its last step
pub fn completed(prev: &DurableRecord) -> DurableRecord {
    DurableRecord {
        enrollment_id: prev.enrollment_id.clone(),
        sequence: prev.sequence + 1,
        state: prev.state.transition(&EnrollmentEvent::StepsExhausted),
        pending: None,
        transition: Transition::Completed,
    }
}
