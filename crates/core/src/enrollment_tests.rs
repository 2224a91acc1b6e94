// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::step::StepKind;

fn id() -> EnrollmentId {
    EnrollmentId::new("enr-1")
}

fn three_steps() -> CadenceSnapshot {
    CadenceSnapshot::new(vec![
        Step::send("s1", "Welcome", "Hello"),
        Step::wait("w1", 10.0),
        Step::send("s2", "Follow up", "Still there?"),
    ])
}

/// Drive the pure state machine without signals until it halts
fn run_to_end(mut state: EnrollmentState) -> EnrollmentState {
    loop {
        let event = match state.next_action() {
            NextAction::Halt => return state,
            NextAction::Complete => EnrollmentEvent::StepsExhausted,
            NextAction::Run { .. } => EnrollmentEvent::StepResolved,
        };
        state = state.transition(&event);
    }
}

#[test]
fn empty_snapshot_starts_completed() {
    let state = EnrollmentState::start(id(), "a@example.com", CadenceSnapshot::default());
    assert_eq!(state.status, EnrollmentStatus::Completed);
    assert_eq!(state.current_step_index, 0);
    assert_eq!(state.steps_version, 1);
    assert_eq!(state.next_action(), NextAction::Halt);
}

#[test]
fn new_enrollment_runs_first_step() {
    let state = EnrollmentState::start(id(), "a@example.com", three_steps());
    assert_eq!(state.status, EnrollmentStatus::Running);
    match state.next_action() {
        NextAction::Run { index, step } => {
            assert_eq!(index, 0);
            assert_eq!(step.id, "s1");
        }
        other => panic!("expected Run, got {:?}", other),
    }
}

#[test]
fn run_without_signals_completes_at_end() {
    let state = run_to_end(EnrollmentState::start(id(), "a@example.com", three_steps()));
    assert_eq!(state.status, EnrollmentStatus::Completed);
    assert_eq!(state.current_step_index, 3);
    assert_eq!(state.steps_version, 1);
}

#[test]
fn signal_past_current_index_completes_immediately() {
    let state = EnrollmentState::start(id(), "a@example.com", three_steps())
        .transition(&EnrollmentEvent::StepResolved);
    assert_eq!(state.current_step_index, 1);

    let state = state.transition(&EnrollmentEvent::StepsReplaced {
        steps: CadenceSnapshot::new(vec![Step::wait("w0", 0.0)]),
    });

    assert_eq!(state.steps_version, 2);
    assert_eq!(state.status, EnrollmentStatus::Completed);
    assert_eq!(state.current_step_index, 1);
}

#[test]
fn signal_with_longer_list_keeps_running() {
    let state = EnrollmentState::start(id(), "a@example.com", three_steps())
        .transition(&EnrollmentEvent::StepResolved)
        .transition(&EnrollmentEvent::StepsReplaced {
            steps: CadenceSnapshot::new(vec![
                Step::send("n1", "A", ""),
                Step::send("n2", "B", ""),
            ]),
        });

    assert_eq!(state.status, EnrollmentStatus::Running);
    assert_eq!(state.current_step_index, 1);
    assert_eq!(state.current_step().map(|s| s.id.as_str()), Some("n2"));
}

#[test]
fn signal_on_terminal_state_is_a_no_op() {
    let done = run_to_end(EnrollmentState::start(id(), "a@example.com", three_steps()));
    let after = done.transition(&EnrollmentEvent::StepsReplaced {
        steps: three_steps(),
    });
    assert_eq!(after, done);
}

#[test]
fn send_failure_marks_failed_with_reason() {
    let state = EnrollmentState::start(id(), "a@example.com", three_steps()).transition(
        &EnrollmentEvent::SendFailed {
            reason: "exhausted".to_string(),
        },
    );
    assert_eq!(state.status, EnrollmentStatus::Failed);
    assert_eq!(state.failure.as_deref(), Some("exhausted"));
    assert_eq!(state.next_action(), NextAction::Halt);

    // Failed never reverses
    let state = state.transition(&EnrollmentEvent::StepsReplaced {
        steps: CadenceSnapshot::default(),
    });
    assert_eq!(state.status, EnrollmentStatus::Failed);
}

#[test]
fn unknown_step_kind_still_advances() {
    let steps = CadenceSnapshot::new(vec![Step {
        id: "x".to_string(),
        kind: StepKind::Unknown,
        subject: None,
        body: None,
        seconds: None,
    }]);
    let state = run_to_end(EnrollmentState::start(id(), "a@example.com", steps));
    assert_eq!(state.current_step_index, 1);
    assert_eq!(state.status, EnrollmentStatus::Completed);
}

#[test]
fn steps_exhausted_before_end_is_ignored() {
    let state = EnrollmentState::start(id(), "a@example.com", three_steps());
    assert_eq!(state.transition(&EnrollmentEvent::StepsExhausted), state);
}

#[test]
fn view_exposes_external_shape() {
    let state = EnrollmentState::start(id(), "a@example.com", three_steps());
    let value = serde_json::to_value(EnrollmentView::from(&state)).unwrap();
    let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["currentStepIndex", "status", "steps", "stepsVersion"]
    );
    assert_eq!(value["status"], "RUNNING");
}

// Property-based tests
use proptest::prelude::*;

fn arb_step() -> impl Strategy<Value = Step> {
    (
        "[a-z]{1,6}",
        prop_oneof![
            Just(StepKind::SendMessage),
            Just(StepKind::Wait),
            Just(StepKind::Unknown)
        ],
        proptest::option::of("[ -~]{0,12}"),
        proptest::option::of("[ -~]{0,12}"),
        proptest::option::of((-5i32..120).prop_map(f64::from)),
    )
        .prop_map(|(id, kind, subject, body, seconds)| Step {
            id,
            kind,
            subject,
            body,
            seconds,
        })
}

fn arb_snapshot() -> impl Strategy<Value = CadenceSnapshot> {
    proptest::collection::vec(arb_step(), 0..8).prop_map(CadenceSnapshot::new)
}

#[derive(Debug, Clone)]
enum Op {
    Resolve,
    Replace(CadenceSnapshot),
    Fail,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Resolve),
        2 => arb_snapshot().prop_map(Op::Replace),
        1 => Just(Op::Fail),
    ]
}

proptest! {
    #[test]
    fn signal_free_runs_end_at_len(steps in arb_snapshot()) {
        let len = steps.len();
        let state = run_to_end(EnrollmentState::start(id(), "a@example.com", steps));
        prop_assert_eq!(state.current_step_index, len);
        prop_assert_eq!(state.status, EnrollmentStatus::Completed);
        prop_assert_eq!(state.steps_version, 1);
    }

    #[test]
    fn invariants_hold_under_any_event_order(
        steps in arb_snapshot(),
        ops in proptest::collection::vec(arb_op(), 0..20)
    ) {
        let mut state = EnrollmentState::start(id(), "a@example.com", steps);
        for op in ops {
            let event = match op {
                Op::Resolve => match state.next_action() {
                    NextAction::Complete => EnrollmentEvent::StepsExhausted,
                    _ => EnrollmentEvent::StepResolved,
                },
                Op::Replace(steps) => EnrollmentEvent::StepsReplaced { steps },
                Op::Fail => EnrollmentEvent::SendFailed { reason: "boom".to_string() },
            };
            let next = state.transition(&event);

            prop_assert!(next.current_step_index >= state.current_step_index);
            if state.is_terminal() {
                prop_assert_eq!(&next, &state);
            }
            if let EnrollmentEvent::StepsReplaced { .. } = event {
                if !state.is_terminal() {
                    prop_assert_eq!(next.steps_version, state.steps_version + 1);
                }
            } else {
                prop_assert_eq!(next.steps_version, state.steps_version);
            }
            state = next;
        }
    }

    #[test]
    fn enrollment_state_serde_roundtrip(steps in arb_snapshot(), resolved in 0usize..4) {
        let mut state = EnrollmentState::start(id(), "a@example.com", steps);
        for _ in 0..resolved {
            state = state.transition(&EnrollmentEvent::StepResolved);
        }
        let json = serde_json::to_string(&state).unwrap();
        let back: EnrollmentState = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, state);
    }
}
