//! Enrollment lifecycle specs

use crate::prelude::*;
use cadence_core::{EnrollmentStatus, Step};
use cadence_daemon::{Request, Response};

#[tokio::test]
async fn enrollment_runs_to_completion() {
    let mut daemon = Daemon::start().await;
    daemon
        .create(
            "onboarding",
            vec![
                Step::send("s1", "Welcome", "Hello"),
                Step::wait("w1", 0.02),
                Step::send("s2", "Tips", "Here are some tips"),
            ],
        )
        .await;

    let id = daemon.enroll("onboarding").await;
    let view = daemon.wait_for(&id, EnrollmentStatus::Completed).await;

    assert_eq!(view.current_step_index, 3);
    assert_eq!(view.steps_version, 1);
    assert!(view.failure.is_none());

    daemon.stop().await;
}

#[tokio::test]
async fn enrollment_keeps_its_snapshot_when_cadence_changes() {
    let mut daemon = Daemon::start().await;
    daemon
        .create(
            "drip",
            vec![Step::wait("w1", 30.0), Step::send("s1", "Hi", "Hello")],
        )
        .await;
    let id = daemon.enroll("drip").await;

    let response = daemon
        .request(Request::UpdateCadence {
            id: "drip".to_string(),
            cadence: cadence_core::Cadence::new("drip", "drip", vec![]),
        })
        .await;
    assert!(matches!(response, Response::Cadence { .. }));

    let view = daemon.enrollment(&id).await;
    assert_eq!(view.steps.len(), 2);
    assert_eq!(view.status, EnrollmentStatus::Running);

    // New enrollments see the new definition
    let fresh = daemon.enroll("drip").await;
    let view = daemon.wait_for(&fresh, EnrollmentStatus::Completed).await;
    assert!(view.steps.is_empty());

    daemon.stop().await;
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let mut daemon = Daemon::start().await;

    let enroll = daemon
        .request(Request::Enroll {
            cadence_id: "ghost".to_string(),
            contact_email: "a@example.com".to_string(),
        })
        .await;
    assert!(matches!(enroll, Response::NotFound { .. }));

    let get = daemon
        .request(Request::GetEnrollment {
            id: "ghost".to_string(),
        })
        .await;
    assert!(matches!(get, Response::NotFound { .. }));

    daemon.stop().await;
}
