//! Shared helpers for daemon specs

use cadence_core::{Cadence, EnrollmentStatus, EnrollmentView, Step};
use cadence_daemon::lifecycle::{startup, Config, DaemonState};
use cadence_daemon::{handle_request, Request, Response};
use std::time::Duration;
use tempfile::TempDir;

/// A daemon running against a throwaway state directory
pub struct Daemon {
    pub dir: TempDir,
    pub state: DaemonState,
}

impl Daemon {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state = startup(&Config::for_state_dir(dir.path())).await.unwrap();
        Self { dir, state }
    }

    /// Stop and start again on the same state directory
    pub async fn restart(self) -> Self {
        let Daemon { dir, mut state } = self;
        state.shutdown().await.unwrap();
        drop(state);
        let state = startup(&Config::for_state_dir(dir.path())).await.unwrap();
        Self { dir, state }
    }

    pub async fn stop(mut self) {
        self.state.shutdown().await.unwrap();
    }

    pub async fn request(&mut self, request: Request) -> Response {
        handle_request(&mut self.state, request).await
    }

    pub async fn create(&mut self, id: &str, steps: Vec<Step>) {
        let cadence = Cadence::new(id, id, steps);
        match self.request(Request::CreateCadence { cadence }).await {
            Response::Cadence { .. } => {}
            other => panic!("create {} failed: {:?}", id, other),
        }
    }

    pub async fn enroll(&mut self, cadence_id: &str) -> String {
        match self
            .request(Request::Enroll {
                cadence_id: cadence_id.to_string(),
                contact_email: "contact@example.com".to_string(),
            })
            .await
        {
            Response::Enrolled { enrollment_id } => enrollment_id,
            other => panic!("enroll in {} failed: {:?}", cadence_id, other),
        }
    }

    pub async fn enrollment(&mut self, id: &str) -> EnrollmentView {
        match self
            .request(Request::GetEnrollment { id: id.to_string() })
            .await
        {
            Response::Enrollment { enrollment } => enrollment,
            other => panic!("get {} failed: {:?}", id, other),
        }
    }

    pub async fn update(&mut self, id: &str, steps: Vec<Step>) -> Response {
        self.request(Request::UpdateEnrollment {
            id: id.to_string(),
            steps,
        })
        .await
    }

    /// Poll until `check` holds, for up to five seconds
    pub async fn wait_until(
        &mut self,
        id: &str,
        check: impl Fn(&EnrollmentView) -> bool,
    ) -> EnrollmentView {
        for _ in 0..500 {
            let view = self.enrollment(id).await;
            if check(&view) {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("enrollment {} never reached the expected state", id);
    }

    pub async fn wait_for(&mut self, id: &str, status: EnrollmentStatus) -> EnrollmentView {
        self.wait_until(id, |view| view.status == status).await
    }
}
