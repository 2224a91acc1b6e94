// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! cadence-core: domain types for the cadence execution engine
//!
//! This crate provides:
//! - Cadence definitions, steps, and per-enrollment snapshots
//! - The pure enrollment state machine
//! - Durable record shapes shared by storage and the engine
//! - Clock and id abstractions with fakes for tests

pub mod cadence;
pub mod clock;
pub mod config;
pub mod enrollment;
pub mod id;
pub mod message;
pub mod record;
pub mod step;

pub use cadence::{Cadence, CadenceSnapshot};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, DurabilityConfig, EngineConfig, RetryConfig};
pub use enrollment::{
    EnrollmentEvent, EnrollmentId, EnrollmentState, EnrollmentStatus, EnrollmentView, NextAction,
};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use message::{IdempotencyKey, OutboundMessage, SendReceipt};
pub use record::{DurableRecord, PendingAction, Transition};
pub use step::{validate_steps, Step, StepAction, StepError, StepKind};
