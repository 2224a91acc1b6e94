// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity executor: message sends with bounded retry
//!
//! Each attempt is bounded by `attempt_timeout`. Transient failures and
//! timeouts back off exponentially (with jitter when configured) up to
//! `max_retries` retries; rejections fail immediately.

use backon::{ExponentialBuilder, Retryable};
use cadence_adapters::{MessageSender, SendError};
use cadence_core::{IdempotencyKey, OutboundMessage, RetryConfig, SendReceipt};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Terminal outcome of a send that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivityError {
    #[error("send failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: usize, last_error: String },
    #[error("send rejected: {0}")]
    Rejected(String),
}

pub struct ActivityExecutor<S: MessageSender> {
    sender: S,
    retry: RetryConfig,
}

impl<S: MessageSender> ActivityExecutor<S> {
    pub fn new(sender: S, retry: RetryConfig) -> Self {
        Self { sender, retry }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.retry.min_delay)
            .with_max_delay(self.retry.max_delay)
            .with_max_times(self.retry.max_retries);
        if self.retry.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Send a message, retrying transient failures under the same key
    pub async fn send(
        &self,
        message: &OutboundMessage,
        key: &IdempotencyKey,
    ) -> Result<SendReceipt, ActivityError> {
        let sender = &self.sender;
        let timeout = self.retry.attempt_timeout;
        let attempts = AtomicUsize::new(0);
        let attempts_ref = &attempts;

        let attempt = || async move {
            let n = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(%key, attempt = n, "send attempt");
            match tokio::time::timeout(timeout, sender.send(message, key)).await {
                Ok(result) => result,
                Err(_) => Err(SendError::Transient(format!(
                    "attempt timed out after {:?}",
                    timeout
                ))),
            }
        };

        let result = attempt
            .retry(self.backoff())
            .when(SendError::is_transient)
            .notify(|err: &SendError, delay| {
                tracing::warn!(
                    %key,
                    attempt = attempts_ref.load(Ordering::SeqCst),
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying send"
                );
            })
            .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(receipt) => Ok(receipt),
            Err(SendError::Rejected(reason)) => {
                tracing::error!(%key, attempts, %reason, "send rejected");
                Err(ActivityError::Rejected(reason))
            }
            Err(err) => {
                tracing::error!(%key, attempts, error = %err, "send retries exhausted");
                Err(ActivityError::Exhausted {
                    attempts,
                    last_error: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
