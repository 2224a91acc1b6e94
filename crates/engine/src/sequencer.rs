// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step sequencer: one actor per enrollment
//!
//! The actor owns its [`EnrollmentState`] and is the only writer of its
//! records. Every transition is appended to the durability log before it is
//! published to queries. Signals queue on an unbounded channel and are applied
//! one at a time: between steps, and while a WAIT or SEND is in flight. A
//! signal never cancels or shortens the in-flight action, except that a WAIT
//! is abandoned once a signal has made the enrollment terminal.

use crate::activity::{ActivityError, ActivityExecutor};
use crate::commit::append_with_retry;
use crate::error::EngineError;
use crate::timer::TimerService;
use cadence_adapters::MessageSender;
use cadence_core::{
    CadenceSnapshot, Clock, DurabilityConfig, DurableRecord, EnrollmentEvent, EnrollmentId,
    EnrollmentState, IdempotencyKey, NextAction, OutboundMessage, PendingAction, StepAction,
    Transition,
};
use cadence_storage::DurabilityLog;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Collaborators shared by every sequencer of one supervisor
pub(crate) struct EngineContext<S: MessageSender, C: Clock> {
    pub activity: ActivityExecutor<S>,
    pub timer: TimerService<C>,
    pub log: Arc<dyn DurabilityLog>,
    pub durability: DurabilityConfig,
}

/// Signal and query access to one live sequencer
#[derive(Clone)]
pub struct SequencerHandle {
    enrollment_id: EnrollmentId,
    signals: mpsc::UnboundedSender<CadenceSnapshot>,
    state: watch::Receiver<EnrollmentState>,
}

impl SequencerHandle {
    pub fn enrollment_id(&self) -> &EnrollmentId {
        &self.enrollment_id
    }

    /// Last committed state
    pub fn query(&self) -> EnrollmentState {
        self.state.borrow().clone()
    }

    /// Queue a step-list replacement
    ///
    /// Returns `false` if the sequencer has already stopped.
    pub fn signal(&self, steps: CadenceSnapshot) -> bool {
        self.signals.send(steps).is_ok()
    }

    /// Whether the actor has stopped, normally or on a durability failure
    pub fn is_stopped(&self) -> bool {
        self.signals.is_closed()
    }

    /// Resolve once the actor has stopped
    pub async fn stopped(&self) {
        self.signals.closed().await
    }

    /// Resolve with the first committed state matching `predicate`
    ///
    /// If the actor stops first, resolves with its last committed state.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&EnrollmentState) -> bool,
    ) -> EnrollmentState {
        let mut state = self.state.clone();
        let matched = state.wait_for(predicate).await.map(|s| (*s).clone());
        matched.unwrap_or_else(|_| state.borrow().clone())
    }

    /// Resolve with the terminal state, or the last committed state if the
    /// actor stops before reaching one
    pub async fn wait_until_terminal(&self) -> EnrollmentState {
        self.wait_for(EnrollmentState::is_terminal).await
    }
}

/// The per-enrollment actor
pub(crate) struct StepSequencer<S: MessageSender, C: Clock> {
    ctx: Arc<EngineContext<S, C>>,
    state: EnrollmentState,
    pending: Option<PendingAction>,
    next_sequence: u64,
    resolved: HashSet<IdempotencyKey>,
    signals: mpsc::UnboundedReceiver<CadenceSnapshot>,
    published: watch::Sender<EnrollmentState>,
}

impl<S: MessageSender, C: Clock> StepSequencer<S, C> {
    /// Build an actor from its latest committed record
    ///
    /// `resolved` holds every idempotency key already resolved in this
    /// enrollment's history.
    pub(crate) fn from_record(
        ctx: Arc<EngineContext<S, C>>,
        latest: DurableRecord,
        resolved: HashSet<IdempotencyKey>,
    ) -> (Self, SequencerHandle) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(latest.state.clone());

        let handle = SequencerHandle {
            enrollment_id: latest.enrollment_id.clone(),
            signals: signal_tx,
            state: state_rx,
        };
        let sequencer = Self {
            ctx,
            state: latest.state,
            pending: latest.pending,
            next_sequence: latest.sequence + 1,
            resolved,
            signals: signal_rx,
            published: state_tx,
        };
        (sequencer, handle)
    }

    /// Drive the enrollment until it is terminal
    pub(crate) async fn run(mut self) -> Result<EnrollmentState, EngineError> {
        // A marker left by a previous process names the position it was
        // suspended at; signals since then may have replaced that step
        let mut resume = self.pending.clone();

        loop {
            self.drain_signals().await?;

            let (step_id, action) = match self.state.next_action() {
                NextAction::Halt => break,
                NextAction::Complete => {
                    let next = self.state.transition(&EnrollmentEvent::StepsExhausted);
                    self.commit(next, None, Transition::Completed).await?;
                    break;
                }
                NextAction::Run { step, .. } => (step.id.clone(), step.action()),
            };

            match resume
                .take()
                .filter(|pending| pending.step_index() == self.state.current_step_index)
            {
                Some(pending) => self.finish_pending(pending).await?,
                None => self.run_step(&step_id, action).await?,
            }

            if !self.state.is_terminal() {
                let next = self.state.transition(&EnrollmentEvent::StepResolved);
                self.commit(next, None, Transition::StepAdvanced).await?;
            }
        }

        self.discard_signals();
        tracing::info!(
            status = %self.state.status,
            current_step_index = self.state.current_step_index,
            steps_version = self.state.steps_version,
            "enrollment finished"
        );
        Ok(self.state)
    }

    /// Start the step at the current index
    async fn run_step(&mut self, step_id: &str, action: StepAction) -> Result<(), EngineError> {
        match action {
            StepAction::Wait {
                duration: Some(duration),
            } => {
                let deadline = self.arm_timer(step_id, duration).await?;
                self.wait(deadline).await
            }
            StepAction::SendMessage { subject, body } => {
                let key = IdempotencyKey::for_step(&self.state.enrollment_id, step_id);
                if self.resolved.contains(&key) {
                    tracing::info!(%step_id, %key, "send already resolved, skipping");
                    return Ok(());
                }
                let message = OutboundMessage {
                    to: self.state.contact_address.clone(),
                    subject,
                    body,
                };
                self.dispatch(step_id, message, key, false).await
            }
            StepAction::Wait { duration: None } => Ok(()),
            StepAction::Noop => {
                tracing::warn!(%step_id, "step has no known kind, skipping");
                Ok(())
            }
        }
    }

    /// Finish the action a previous process was suspended on
    ///
    /// The marker, not the step now at this index, decides what runs.
    async fn finish_pending(&mut self, pending: PendingAction) -> Result<(), EngineError> {
        match pending {
            PendingAction::Wait {
                step_id, deadline, ..
            } => {
                tracing::info!(%step_id, %deadline, "re-arming persisted timer");
                self.wait(deadline).await
            }
            PendingAction::Send {
                step_id,
                idempotency_key,
                message,
                ..
            } => {
                if self.resolved.contains(&idempotency_key) {
                    tracing::info!(
                        %step_id,
                        key = %idempotency_key,
                        "send already resolved, skipping"
                    );
                    return Ok(());
                }
                self.dispatch(&step_id, message, idempotency_key, true).await
            }
        }
    }

    async fn arm_timer(
        &mut self,
        step_id: &str,
        duration: Duration,
    ) -> Result<DateTime<Utc>, EngineError> {
        let deadline = self
            .ctx
            .timer
            .schedule(&self.state.enrollment_id, duration);
        let pending = PendingAction::Wait {
            step_index: self.state.current_step_index,
            step_id: step_id.to_string(),
            deadline,
        };
        self.commit(self.state.clone(), Some(pending), Transition::WaitArmed)
            .await?;
        tracing::info!(%step_id, %deadline, "waiting");
        Ok(deadline)
    }

    /// Sleep until `deadline`, applying signals as they arrive
    async fn wait(&mut self, deadline: DateTime<Utc>) -> Result<(), EngineError> {
        let ctx = Arc::clone(&self.ctx);
        let timer = ctx.timer.wait_until(deadline);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return Ok(()),
                Some(steps) = self.signals.recv() => {
                    self.apply_signal(steps).await?;
                    if self.state.is_terminal() {
                        tracing::info!("signal completed enrollment, abandoning timer");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run one send step: mark it pending, send, then record the outcome
    async fn dispatch(
        &mut self,
        step_id: &str,
        message: OutboundMessage,
        key: IdempotencyKey,
        redispatch: bool,
    ) -> Result<(), EngineError> {
        if redispatch {
            tracing::info!(%step_id, %key, "re-attempting send left pending");
        } else {
            let pending = PendingAction::Send {
                step_index: self.state.current_step_index,
                step_id: step_id.to_string(),
                idempotency_key: key.clone(),
                message: message.clone(),
            };
            self.commit(self.state.clone(), Some(pending), Transition::SendDispatched)
                .await?;
        }

        // The send always runs to completion; signals are applied meanwhile
        let outcome = {
            let ctx = Arc::clone(&self.ctx);
            let send = ctx.activity.send(&message, &key);
            tokio::pin!(send);
            loop {
                tokio::select! {
                    outcome = &mut send => break outcome,
                    Some(steps) = self.signals.recv() => self.apply_signal(steps).await?,
                }
            }
        };

        match outcome {
            Ok(receipt) => {
                tracing::info!(%step_id, message_id = %receipt.message_id, "message sent");
                self.commit(
                    self.state.clone(),
                    None,
                    Transition::SendResolved {
                        idempotency_key: key.clone(),
                        receipt,
                    },
                )
                .await?;
                self.resolved.insert(key);
            }
            Err(err) if self.state.is_terminal() => {
                tracing::warn!(%step_id, error = %err, "send failed after enrollment finished");
                self.commit(
                    self.state.clone(),
                    None,
                    Transition::SendAbandoned {
                        idempotency_key: key,
                        reason: err.to_string(),
                    },
                )
                .await?;
            }
            Err(err) => {
                let reason = failure_reason(step_id, &err);
                tracing::error!(%step_id, %reason, "send failed, enrollment failed");
                let next = self.state.transition(&EnrollmentEvent::SendFailed {
                    reason: reason.clone(),
                });
                self.commit(next, None, Transition::Failed { reason })
                    .await?;
            }
        }
        Ok(())
    }

    /// Apply every signal already queued, in order
    async fn drain_signals(&mut self) -> Result<(), EngineError> {
        while let Ok(steps) = self.signals.try_recv() {
            self.apply_signal(steps).await?;
        }
        Ok(())
    }

    async fn apply_signal(&mut self, steps: CadenceSnapshot) -> Result<(), EngineError> {
        if self.state.is_terminal() {
            tracing::info!(status = %self.state.status, "signal ignored, enrollment is finished");
            return Ok(());
        }

        let next = self
            .state
            .transition(&EnrollmentEvent::StepsReplaced { steps });
        // A finished enrollment has no timer to resume; an in-flight send
        // stays pending until it resolves
        let pending = match &self.pending {
            Some(PendingAction::Wait { .. }) if next.is_terminal() => None,
            other => other.clone(),
        };
        tracing::info!(
            steps_version = next.steps_version,
            steps = next.steps.len(),
            status = %next.status,
            "steps replaced"
        );
        self.commit(next, pending, Transition::StepsReplaced).await
    }

    /// Close the channel and log anything that arrived too late
    fn discard_signals(&mut self) {
        self.signals.close();
        while let Ok(steps) = self.signals.try_recv() {
            tracing::info!(steps = steps.len(), "signal ignored, enrollment is finished");
        }
    }

    /// Append a transition, then make it visible
    async fn commit(
        &mut self,
        state: EnrollmentState,
        pending: Option<PendingAction>,
        transition: Transition,
    ) -> Result<(), EngineError> {
        let record = DurableRecord {
            enrollment_id: self.state.enrollment_id.clone(),
            sequence: self.next_sequence,
            state,
            pending,
            transition,
        };

        append_with_retry(self.ctx.log.as_ref(), &record, &self.ctx.durability)
            .await
            .map_err(|source| {
                tracing::error!(
                    sequence = record.sequence,
                    transition = record.transition.name(),
                    error = %source,
                    "durable append failed, stopping"
                );
                EngineError::Durability {
                    enrollment_id: record.enrollment_id.clone(),
                    source,
                }
            })?;

        tracing::debug!(
            sequence = record.sequence,
            transition = record.transition.name(),
            current_step_index = record.state.current_step_index,
            "committed"
        );
        self.next_sequence += 1;
        self.pending = record.pending;
        self.state = record.state;
        self.published.send_replace(self.state.clone());
        Ok(())
    }
}

fn failure_reason(step_id: &str, err: &ActivityError) -> String {
    format!("step {}: {}", step_id, err)
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
