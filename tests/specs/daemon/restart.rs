//! Restart specs
//!
//! A daemon restart resumes every running enrollment where it left off.

use crate::prelude::*;
use cadence_core::{EnrollmentStatus, Step};
use cadence_daemon::{Request, Response};

#[tokio::test]
async fn running_enrollment_resumes_after_restart() {
    let mut daemon = Daemon::start().await;
    daemon
        .create(
            "slow",
            vec![
                Step::send("s1", "Welcome", "Hello"),
                Step::wait("w1", 0.5),
                Step::send("s2", "Follow up", "Still there?"),
            ],
        )
        .await;
    let id = daemon.enroll("slow").await;
    daemon.wait_until(&id, |v| v.current_step_index == 1).await;

    let mut daemon = daemon.restart().await;
    assert_eq!(daemon.state.recovery.recovered, 1);

    let view = daemon.wait_for(&id, EnrollmentStatus::Completed).await;
    assert_eq!(view.current_step_index, 3);
    assert_eq!(view.steps_version, 1);

    daemon.stop().await;
}

#[tokio::test]
async fn finished_enrollments_stay_finished() {
    let mut daemon = Daemon::start().await;
    daemon
        .create("quick", vec![Step::send("s1", "Hi", "Hello")])
        .await;
    let id = daemon.enroll("quick").await;
    daemon.wait_for(&id, EnrollmentStatus::Completed).await;

    let mut daemon = daemon.restart().await;
    assert_eq!(daemon.state.recovery.recovered, 0);
    assert_eq!(daemon.state.recovery.finished, 1);

    let view = daemon.enrollment(&id).await;
    assert_eq!(view.status, EnrollmentStatus::Completed);
    assert_eq!(view.current_step_index, 1);

    daemon.stop().await;
}

#[tokio::test]
async fn cadences_survive_restart() {
    let mut daemon = Daemon::start().await;
    daemon.create("kept", vec![Step::wait("w1", 1.0)]).await;

    let mut daemon = daemon.restart().await;
    let response = daemon
        .request(Request::GetCadence {
            id: "kept".to_string(),
        })
        .await;
    assert!(matches!(response, Response::Cadence { cadence } if cadence.steps.len() == 1));

    daemon.stop().await;
}
