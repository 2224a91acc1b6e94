// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment supervisor
//!
//! Owns one sequencer per live enrollment and is the only component that
//! knows about more than one enrollment at a time.

use crate::activity::ActivityExecutor;
use crate::commit::append_with_retry;
use crate::error::EngineError;
use crate::sequencer::{EngineContext, SequencerHandle, StepSequencer};
use crate::timer::TimerService;
use cadence_adapters::MessageSender;
use cadence_core::{
    validate_steps, CadenceSnapshot, Clock, DurableRecord, EngineConfig, EnrollmentId,
    EnrollmentState, IdGen, IdempotencyKey, Transition,
};
use cadence_storage::{CadenceStore, DurabilityLog};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Supervisor dependencies
pub struct EngineDeps<S, C, I> {
    pub sender: S,
    pub clock: C,
    pub id_gen: I,
    pub log: Arc<dyn DurabilityLog>,
    pub store: Arc<dyn CadenceStore>,
    pub config: EngineConfig,
}

/// Outcome of [`EnrollmentSupervisor::recover_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Running enrollments whose sequencer was restarted
    pub recovered: usize,
    /// Enrollments already COMPLETED or FAILED
    pub finished: usize,
    /// Enrollments already live in this process
    pub live: usize,
    /// Enrollments that could not be read or restarted
    pub failed: usize,
}

struct LiveSequencer {
    handle: SequencerHandle,
    task: JoinHandle<()>,
}

pub struct EnrollmentSupervisor<S: MessageSender, C: Clock, I: IdGen> {
    ctx: Arc<EngineContext<S, C>>,
    store: Arc<dyn CadenceStore>,
    id_gen: I,
    live: Mutex<HashMap<EnrollmentId, LiveSequencer>>,
}

impl<S, C, I> EnrollmentSupervisor<S, C, I>
where
    S: MessageSender,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: EngineDeps<S, C, I>) -> Self {
        let ctx = EngineContext {
            activity: ActivityExecutor::new(deps.sender, deps.config.retry),
            timer: TimerService::new(deps.clock),
            log: deps.log,
            durability: deps.config.durability,
        };
        Self {
            ctx: Arc::new(ctx),
            store: deps.store,
            id_gen: deps.id_gen,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Enroll a contact in a stored cadence
    ///
    /// The definition is read once and copied into the enrollment.
    pub async fn enroll(
        &self,
        cadence_id: &str,
        contact_address: &str,
    ) -> Result<EnrollmentId, EngineError> {
        let cadence = self
            .store
            .get(cadence_id)?
            .ok_or_else(|| EngineError::CadenceNotFound(cadence_id.to_string()))?;
        self.start(cadence.snapshot(), contact_address).await
    }

    /// Start an enrollment over the given steps
    ///
    /// Returns once the initial record is committed.
    pub async fn start(
        &self,
        steps: CadenceSnapshot,
        contact_address: &str,
    ) -> Result<EnrollmentId, EngineError> {
        validate_steps(steps.steps())?;

        let id = self.id_gen.next_enrollment_id();
        let state = EnrollmentState::start(id.clone(), contact_address, steps);
        let transition = if state.is_terminal() {
            Transition::Completed
        } else {
            Transition::Started
        };
        let record = DurableRecord {
            enrollment_id: id.clone(),
            sequence: 0,
            state,
            pending: None,
            transition,
        };

        append_with_retry(self.ctx.log.as_ref(), &record, &self.ctx.durability)
            .await
            .map_err(|source| EngineError::Durability {
                enrollment_id: id.clone(),
                source,
            })?;
        tracing::info!(
            enrollment_id = %id,
            steps = record.state.steps.len(),
            status = %record.state.status,
            "enrollment started"
        );

        if !record.state.is_terminal() {
            self.spawn(record, HashSet::new());
        }
        Ok(id)
    }

    /// Last committed state of an enrollment
    pub fn get(&self, id: &EnrollmentId) -> Result<EnrollmentState, EngineError> {
        if let Some(handle) = self.live_handle(id) {
            return Ok(handle.query());
        }
        self.ctx
            .log
            .read_latest(id)?
            .map(|record| record.state)
            .ok_or_else(|| EngineError::EnrollmentNotFound(id.clone()))
    }

    /// Replace the step list of a running enrollment
    ///
    /// Finished enrollments accept the signal as a no-op. A running
    /// enrollment without a live sequencer is reported as stalled.
    pub fn update(&self, id: &EnrollmentId, steps: CadenceSnapshot) -> Result<(), EngineError> {
        validate_steps(steps.steps())?;

        if let Some(handle) = self.live_handle(id) {
            if handle.signal(steps) {
                tracing::info!(enrollment_id = %id, "signal queued");
                return Ok(());
            }
            // The actor has stopped; answer from its last committed state
            return signal_stopped(id, &handle.query());
        }

        match self.ctx.log.read_latest(id)? {
            Some(record) => signal_stopped(id, &record.state),
            None => Err(EngineError::EnrollmentNotFound(id.clone())),
        }
    }

    /// Restart every running enrollment found in the log
    pub fn recover_all(&self) -> Result<RecoveryReport, EngineError> {
        let mut report = RecoveryReport::default();

        for id in self.ctx.log.enrollment_ids()? {
            if self.is_running(&id) {
                report.live += 1;
                continue;
            }
            match self.resume(&id) {
                Ok(state) if state.is_terminal() => report.finished += 1,
                Ok(_) => report.recovered += 1,
                Err(EngineError::EnrollmentNotFound(_)) => {}
                Err(e) => {
                    tracing::error!(enrollment_id = %id, error = %e, "recovery failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            recovered = report.recovered,
            finished = report.finished,
            live = report.live,
            failed = report.failed,
            "recovery complete"
        );
        Ok(report)
    }

    /// Restart one enrollment from its latest record
    ///
    /// A no-op for enrollments that are live or finished.
    pub fn resume(&self, id: &EnrollmentId) -> Result<EnrollmentState, EngineError> {
        if let Some(handle) = self.handle(id) {
            if !handle.is_stopped() {
                return Ok(handle.query());
            }
        }

        let latest = self
            .ctx
            .log
            .read_latest(id)?
            .ok_or_else(|| EngineError::EnrollmentNotFound(id.clone()))?;
        let state = latest.state.clone();
        if state.is_terminal() {
            return Ok(state);
        }

        let resolved: HashSet<IdempotencyKey> = self
            .ctx
            .log
            .replay_from(id, 0)?
            .iter()
            .filter_map(DurableRecord::resolved_key)
            .cloned()
            .collect();

        tracing::info!(
            enrollment_id = %id,
            sequence = latest.sequence,
            current_step_index = state.current_step_index,
            pending = ?latest.pending,
            resolved_sends = resolved.len(),
            "resuming enrollment"
        );
        self.spawn(latest, resolved);
        Ok(state)
    }

    /// Handle to a sequencer started by this supervisor
    pub fn handle(&self, id: &EnrollmentId) -> Option<SequencerHandle> {
        let live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.get(id).map(|entry| entry.handle.clone())
    }

    /// Number of sequencers still running
    pub fn live_count(&self) -> usize {
        self.sweep().len()
    }

    /// Stop every sequencer
    ///
    /// Their state is already durable; `recover_all` picks them up again.
    pub async fn shutdown(&self) {
        let entries: Vec<(EnrollmentId, LiveSequencer)> = {
            let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
            live.drain().collect()
        };
        let count = entries.len();
        for (_, entry) in &entries {
            entry.task.abort();
        }
        for (_, entry) in entries {
            let _ = entry.task.await;
        }
        tracing::info!(count, "sequencers stopped");
    }

    /// Lock the live map, dropping sequencers whose task has ended
    ///
    /// Their last record is in the log, which answers for them from then on.
    fn sweep(&self) -> MutexGuard<'_, HashMap<EnrollmentId, LiveSequencer>> {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.retain(|_, entry| !entry.task.is_finished());
        live
    }

    fn live_handle(&self, id: &EnrollmentId) -> Option<SequencerHandle> {
        self.sweep().get(id).map(|entry| entry.handle.clone())
    }

    fn is_running(&self, id: &EnrollmentId) -> bool {
        self.handle(id).is_some_and(|handle| !handle.is_stopped())
    }

    fn spawn(&self, latest: DurableRecord, resolved: HashSet<IdempotencyKey>) {
        let id = latest.enrollment_id.clone();
        let (sequencer, handle) =
            StepSequencer::from_record(Arc::clone(&self.ctx), latest, resolved);

        let span = tracing::info_span!("enrollment", enrollment_id = %id);
        let task_id = id.clone();
        let task = tokio::spawn(
            async move {
                if let Err(e) = sequencer.run().await {
                    tracing::error!(enrollment_id = %task_id, error = %e, "sequencer stopped");
                }
            }
            .instrument(span),
        );

        let mut live = self.sweep();
        if let Some(previous) = live.insert(id, LiveSequencer { handle, task }) {
            previous.task.abort();
        }
    }
}

fn signal_stopped(id: &EnrollmentId, state: &EnrollmentState) -> Result<(), EngineError> {
    if state.is_terminal() {
        tracing::info!(
            enrollment_id = %id,
            status = %state.status,
            "signal ignored, enrollment is finished"
        );
        Ok(())
    } else {
        tracing::warn!(enrollment_id = %id, "signal refused, enrollment is stalled");
        Err(EngineError::Stalled(id.clone()))
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
