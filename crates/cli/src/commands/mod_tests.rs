// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::enrollment::StepsDocument;
use super::read_json;
use cadence_core::{Cadence, StepKind};

#[test]
fn reads_cadence_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.json");
    std::fs::write(
        &path,
        r#"{"id":"c1","name":"Intro","steps":[{"id":"s1","type":"SEND_EMAIL","subject":"Hi","body":"Hello"}]}"#,
    )
    .unwrap();

    let cadence: Cadence = read_json(&path).unwrap();
    assert_eq!(cadence.id, "c1");
    assert_eq!(cadence.steps[0].kind, StepKind::SendMessage);
}

#[test]
fn steps_accept_bare_list_or_object() {
    let dir = tempfile::tempdir().unwrap();
    let bare = dir.path().join("bare.json");
    let wrapped = dir.path().join("wrapped.json");
    std::fs::write(&bare, r#"[{"id":"w1","kind":"WAIT","seconds":5}]"#).unwrap();
    std::fs::write(&wrapped, r#"{"steps":[{"id":"w1","kind":"WAIT","seconds":5}]}"#).unwrap();

    let a: StepsDocument = read_json(&bare).unwrap();
    let b: StepsDocument = read_json(&wrapped).unwrap();
    assert_eq!(a.into_steps(), b.into_steps());
}

#[test]
fn missing_and_malformed_files_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let err = read_json::<Cadence>(&missing).unwrap_err();
    assert!(err.to_string().contains("failed to read"));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{").unwrap();
    let err = read_json::<Cadence>(&broken).unwrap_err();
    assert!(err.to_string().contains("invalid JSON"));
}
