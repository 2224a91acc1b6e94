// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable appends with bounded retry

use backon::{ExponentialBuilder, Retryable};
use cadence_core::{DurabilityConfig, DurableRecord};
use cadence_storage::{DurabilityLog, LogError};

/// Append `record`, retrying failures that may be transient
///
/// Sequence gaps and invalid ids are permanent and returned at once.
pub(crate) async fn append_with_retry(
    log: &dyn DurabilityLog,
    record: &DurableRecord,
    config: &DurabilityConfig,
) -> Result<(), LogError> {
    let backoff = ExponentialBuilder::default()
        .with_min_delay(config.append_backoff)
        .with_max_delay(config.append_backoff.saturating_mul(8))
        .with_max_times(config.append_retries);

    let append = || async move { log.append(record) };

    append
        .retry(backoff)
        .when(|err| !matches!(err, LogError::SequenceGap { .. } | LogError::InvalidId(_)))
        .notify(|err: &LogError, delay| {
            tracing::warn!(
                enrollment_id = %record.enrollment_id,
                sequence = record.sequence,
                retry_in_ms = delay.as_millis() as u64,
                error = %err,
                "retrying durable append"
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{CadenceSnapshot, EnrollmentId, EnrollmentState, Transition};
    use cadence_storage::MemoryLog;
    use std::time::Duration;

    fn record(sequence: u64) -> DurableRecord {
        let id = EnrollmentId::new("enr-1");
        DurableRecord {
            enrollment_id: id.clone(),
            sequence,
            state: EnrollmentState::start(id, "a@example.com", CadenceSnapshot::default()),
            pending: None,
            transition: Transition::Completed,
        }
    }

    fn config(append_retries: usize) -> DurabilityConfig {
        DurabilityConfig {
            append_retries,
            append_backoff: Duration::from_millis(50),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_append_succeeds() {
        let log = MemoryLog::new();
        log.fail_next_appends(2);

        append_with_retry(&log, &record(0), &config(3)).await.unwrap();
        assert_eq!(log.len(&EnrollmentId::new("enr-1")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_configured_retries() {
        let log = MemoryLog::new();
        log.fail_next_appends(4);

        let err = append_with_retry(&log, &record(0), &config(3))
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::Unavailable(_)));
        assert_eq!(log.len(&EnrollmentId::new("enr-1")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_gap_is_not_retried() {
        let log = MemoryLog::new();

        let err = append_with_retry(&log, &record(3), &config(3))
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::SequenceGap { expected: 0, .. }));
    }
}
