// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use cadence_core::{Cadence, CadenceSnapshot, EnrollmentId, EnrollmentView};
use cadence_engine::EngineError;
use cadence_storage::{CadenceStore, StoreError};
use tokio::net::UnixStream;
use tracing::{debug, error};

use crate::lifecycle::DaemonState;
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Handle a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(protocol::ProtocolError::Json(e)) => {
            // Malformed request: tell the client instead of hanging up
            let response = Response::Invalid {
                message: format!("malformed request: {}", e),
            };
            protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(daemon, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request(daemon: &mut DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => Response::Status {
            uptime_secs: daemon.start_time.elapsed().as_secs(),
            enrollments_live: daemon.supervisor.live_count(),
            enrollments_recovered: daemon.recovery.recovered,
        },

        Request::Shutdown => {
            daemon.shutdown_requested = true;
            Response::ShuttingDown
        }

        Request::CreateCadence { cadence } => save_cadence(daemon, cadence),

        Request::GetCadence { id } => match daemon.store.get(&id) {
            Ok(Some(cadence)) => Response::Cadence { cadence },
            Ok(None) => Response::NotFound {
                message: format!("cadence not found: {}", id),
            },
            Err(e) => store_error(e),
        },

        Request::UpdateCadence { id, mut cadence } => {
            cadence.id = id;
            save_cadence(daemon, cadence)
        }

        Request::Enroll {
            cadence_id,
            contact_email,
        } => match daemon.supervisor.enroll(&cadence_id, &contact_email).await {
            Ok(enrollment_id) => Response::Enrolled {
                enrollment_id: enrollment_id.to_string(),
            },
            Err(e) => engine_error(e),
        },

        Request::GetEnrollment { id } => match daemon.supervisor.get(&EnrollmentId::new(id)) {
            Ok(state) => Response::Enrollment {
                enrollment: EnrollmentView::from(&state),
            },
            Err(e) => engine_error(e),
        },

        Request::UpdateEnrollment { id, steps } => {
            let id = EnrollmentId::new(id);
            match daemon.supervisor.update(&id, CadenceSnapshot::new(steps)) {
                Ok(()) => Response::Updated { success: true },
                Err(e) => engine_error(e),
            }
        }
    }
}

fn save_cadence(daemon: &DaemonState, cadence: Cadence) -> Response {
    if cadence.id.trim().is_empty() {
        return Response::Invalid {
            message: "cadence id must not be empty".to_string(),
        };
    }
    if let Err(e) = cadence.validate() {
        return Response::Invalid {
            message: e.to_string(),
        };
    }
    match daemon.store.put(&cadence) {
        Ok(()) => {
            tracing::info!(cadence_id = %cadence.id, steps = cadence.steps.len(), "cadence saved");
            Response::Cadence { cadence }
        }
        Err(e) => store_error(e),
    }
}

fn store_error(e: StoreError) -> Response {
    match e {
        StoreError::InvalidId(_) => Response::Invalid {
            message: e.to_string(),
        },
        _ => {
            error!("cadence store error: {}", e);
            Response::Error {
                message: e.to_string(),
            }
        }
    }
}

fn engine_error(e: EngineError) -> Response {
    let message = e.to_string();
    if e.is_not_found() {
        Response::NotFound { message }
    } else if matches!(e, EngineError::InvalidSteps(_)) {
        Response::Invalid { message }
    } else {
        error!("engine error: {}", message);
        Response::Error { message }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
