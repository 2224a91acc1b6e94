// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::sender::{MessageSender, SendError};
use async_trait::async_trait;
use cadence_core::{IdempotencyKey, OutboundMessage, SendReceipt};
use tracing::Instrument;

/// Wrapper that adds tracing to any MessageSender
#[derive(Clone)]
pub struct TracedSender<S> {
    inner: S,
}

impl<S> TracedSender<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: MessageSender> MessageSender for TracedSender<S> {
    async fn send(
        &self,
        message: &OutboundMessage,
        key: &IdempotencyKey,
    ) -> Result<SendReceipt, SendError> {
        let span = tracing::info_span!("sender.send", %key, to = %message.to);

        async {
            tracing::info!(subject = %message.subject, "starting");

            let start = std::time::Instant::now();
            let result = self.inner.send(message, key).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(receipt) => tracing::info!(
                    message_id = %receipt.message_id,
                    elapsed_ms,
                    "message sent"
                ),
                Err(e) if e.is_transient() => {
                    tracing::warn!(elapsed_ms, error = %e, "send failed (retryable)")
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "send rejected"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
