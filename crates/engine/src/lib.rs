// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cadence execution engine
//!
//! One sequencer actor per enrollment, supervised by [`EnrollmentSupervisor`].
//! Sequencers commit every transition to the durability log before acting on
//! it, so a restart resumes each enrollment from its latest record.

mod activity;
mod commit;
mod error;
mod sequencer;
mod supervisor;
mod timer;

pub use activity::{ActivityError, ActivityExecutor};
pub use error::EngineError;
pub use sequencer::SequencerHandle;
pub use supervisor::{EngineDeps, EnrollmentSupervisor, RecoveryReport};
pub use timer::TimerService;
