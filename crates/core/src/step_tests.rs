// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    send_message = { "SEND_MESSAGE", StepKind::SendMessage },
    legacy_send_email = { "SEND_EMAIL", StepKind::SendMessage },
    wait = { "WAIT", StepKind::Wait },
    lowercase_is_unknown = { "wait", StepKind::Unknown },
    other = { "CALL", StepKind::Unknown },
)]
fn step_kind_parse(name: &str, expected: StepKind) {
    assert_eq!(StepKind::parse(name), expected);
}

#[test]
fn step_reads_external_wire_shape() {
    let step: Step = serde_json::from_value(json!({
        "id": "s1",
        "type": "SEND_EMAIL",
        "subject": "Welcome",
        "body": "Hi"
    }))
    .unwrap();

    assert_eq!(step.kind, StepKind::SendMessage);
    assert_eq!(step.subject.as_deref(), Some("Welcome"));
}

#[test]
fn step_missing_kind_is_unknown() {
    let step: Step = serde_json::from_value(json!({ "id": "s1" })).unwrap();
    assert_eq!(step.kind, StepKind::Unknown);
    assert_eq!(step.action(), StepAction::Noop);
}

#[test]
fn step_malformed_kind_is_unknown() {
    let step: Step = serde_json::from_value(json!({ "id": "s1", "kind": 42 })).unwrap();
    assert_eq!(step.kind, StepKind::Unknown);

    let step: Step = serde_json::from_value(json!({ "id": "s2", "kind": null })).unwrap();
    assert_eq!(step.kind, StepKind::Unknown);
}

#[test]
fn send_step_defaults_missing_subject_and_body() {
    let step: Step = serde_json::from_value(json!({ "id": "s1", "kind": "SEND_MESSAGE" })).unwrap();
    assert_eq!(
        step.action(),
        StepAction::SendMessage {
            subject: String::new(),
            body: String::new(),
        }
    );
}

#[parameterized(
    missing = { None, None },
    zero = { Some(0.0), None },
    negative = { Some(-5.0), None },
    whole = { Some(10.0), Some(Duration::from_secs(10)) },
    fractional = { Some(1.5), Some(Duration::from_millis(1500)) },
    huge_saturates = { Some(1e30), Some(Duration::MAX) },
)]
fn wait_step_duration(seconds: Option<f64>, expected: Option<Duration>) {
    let step = Step {
        id: "w".to_string(),
        kind: StepKind::Wait,
        subject: None,
        body: None,
        seconds,
    };
    assert_eq!(step.action(), StepAction::Wait { duration: expected });
}

#[test]
fn step_serializes_kind_in_screaming_case() {
    let value = serde_json::to_value(Step::wait("w1", 10.0)).unwrap();
    assert_eq!(value, json!({ "id": "w1", "kind": "WAIT", "seconds": 10.0 }));
}

#[test]
fn validate_accepts_unknown_kinds() {
    let steps = vec![
        Step::send("a", "Hi", "Body"),
        Step {
            id: "b".to_string(),
            kind: StepKind::Unknown,
            subject: None,
            body: None,
            seconds: None,
        },
    ];
    assert_eq!(validate_steps(&steps), Ok(()));
}

#[test]
fn validate_rejects_empty_id() {
    let steps = vec![Step::send("a", "Hi", ""), Step::wait("  ", 1.0)];
    assert_eq!(validate_steps(&steps), Err(StepError::EmptyId { index: 1 }));
}

#[test]
fn validate_rejects_duplicate_ids() {
    let steps = vec![Step::send("a", "Hi", ""), Step::wait("a", 1.0)];
    assert_eq!(
        validate_steps(&steps),
        Err(StepError::DuplicateId { id: "a".to_string() })
    );
}

#[test]
fn validate_rejects_non_finite_seconds() {
    let steps = vec![Step::wait("w", f64::INFINITY)];
    assert_eq!(
        validate_steps(&steps),
        Err(StepError::InvalidSeconds { id: "w".to_string() })
    );
}

#[test]
fn validate_accepts_empty_list() {
    assert_eq!(validate_steps(&[]), Ok(()));
}
