// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer service for WAIT steps
//!
//! Deadlines are absolute wall-clock instants so they survive a restart. The
//! sleep itself runs on tokio time for whatever remains of the deadline.

use cadence_core::{Clock, EnrollmentId};
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Clone)]
pub struct TimerService<C: Clock> {
    clock: C,
}

impl<C: Clock> TimerService<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Absolute deadline `duration` from now
    pub fn schedule(&self, enrollment_id: &EnrollmentId, duration: Duration) -> DateTime<Utc> {
        let now = self.clock.now();
        let deadline = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        tracing::debug!(%enrollment_id, %deadline, "timer scheduled");
        deadline
    }

    /// Time left until `deadline`; zero once it has passed
    pub fn remaining(&self, deadline: DateTime<Utc>) -> Duration {
        (deadline - self.clock.now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Resolve once `deadline` has been reached
    ///
    /// Cancel-safe: dropping the future simply forgets the timer.
    pub async fn wait_until(&self, deadline: DateTime<Utc>) {
        let remaining = self.remaining(deadline);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
