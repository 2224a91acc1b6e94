// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message delivery adapters

mod logging;

pub use logging::LoggingSender;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSender, SendCall};

use async_trait::async_trait;
use cadence_core::{IdempotencyKey, OutboundMessage, SendReceipt};
use thiserror::Error;

/// Errors from a delivery backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// Worth retrying: timeouts, throttling, connection trouble
    #[error("transient send failure: {0}")]
    Transient(String),
    /// The backend refused the message; retrying will not help
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl SendError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SendError::Transient(_))
    }
}

/// Adapter for the message-send capability
///
/// Every attempt for the same step carries the same idempotency key. A
/// backend that deduplicates by key delivers each step at most once.
#[async_trait]
pub trait MessageSender: Clone + Send + Sync + 'static {
    async fn send(
        &self,
        message: &OutboundMessage,
        key: &IdempotencyKey,
    ) -> Result<SendReceipt, SendError>;
}
