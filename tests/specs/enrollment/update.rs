//! Enrollment update specs
//!
//! Step replacement is delivered to the running enrollment as a signal.

use crate::prelude::*;
use cadence_core::{EnrollmentStatus, Step};
use cadence_daemon::Response;

#[tokio::test]
async fn shorter_steps_during_wait_complete_the_enrollment() {
    let mut daemon = Daemon::start().await;
    daemon
        .create(
            "long",
            vec![
                Step::send("s1", "Hi", "Hello"),
                Step::wait("w1", 60.0),
                Step::send("s2", "Again", "Hello again"),
            ],
        )
        .await;
    let id = daemon.enroll("long").await;
    daemon.wait_until(&id, |v| v.current_step_index == 1).await;

    let response = daemon
        .update(&id, vec![Step::send("s1", "Hi", "Hello")])
        .await;
    assert_eq!(response, Response::Updated { success: true });

    let view = daemon.wait_for(&id, EnrollmentStatus::Completed).await;
    assert_eq!(view.steps_version, 2);
    assert_eq!(view.current_step_index, 1);
    assert_eq!(view.steps.len(), 1);

    daemon.stop().await;
}

#[tokio::test]
async fn longer_steps_keep_position() {
    let mut daemon = Daemon::start().await;
    daemon
        .create(
            "grow",
            vec![Step::send("s1", "Hi", "Hello"), Step::wait("w1", 60.0)],
        )
        .await;
    let id = daemon.enroll("grow").await;
    daemon.wait_until(&id, |v| v.current_step_index == 1).await;

    daemon
        .update(
            &id,
            vec![
                Step::send("s1", "Hi", "Hello"),
                Step::wait("w1", 60.0),
                Step::send("s2", "Later", "Later on"),
            ],
        )
        .await;

    let view = daemon.wait_until(&id, |v| v.steps_version == 2).await;
    assert_eq!(view.status, EnrollmentStatus::Running);
    assert_eq!(view.current_step_index, 1);
    assert_eq!(view.steps.len(), 3);

    daemon.stop().await;
}

#[tokio::test]
async fn invalid_steps_are_rejected() {
    let mut daemon = Daemon::start().await;
    daemon.create("c", vec![Step::wait("w1", 60.0)]).await;
    let id = daemon.enroll("c").await;

    let response = daemon
        .update(&id, vec![Step::wait("a", 1.0), Step::wait("a", 2.0)])
        .await;
    assert!(matches!(response, Response::Invalid { .. }));

    let view = daemon.enrollment(&id).await;
    assert_eq!(view.steps_version, 1);

    daemon.stop().await;
}
