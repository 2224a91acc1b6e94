// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mock delivery backend that only logs

use super::{MessageSender, SendError};
use async_trait::async_trait;
use cadence_core::{Clock, IdempotencyKey, OutboundMessage, SendReceipt, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Logs each message instead of delivering it
///
/// Repeated keys return the first receipt without logging again.
#[derive(Clone)]
pub struct LoggingSender<C: Clock = SystemClock> {
    clock: C,
    delivered: Arc<Mutex<HashMap<IdempotencyKey, SendReceipt>>>,
}

impl LoggingSender<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LoggingSender<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LoggingSender<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            delivered: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of distinct keys delivered
    pub fn delivered_count(&self) -> usize {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl<C: Clock> MessageSender for LoggingSender<C> {
    async fn send(
        &self,
        message: &OutboundMessage,
        key: &IdempotencyKey,
    ) -> Result<SendReceipt, SendError> {
        let mut delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(receipt) = delivered.get(key) {
            tracing::debug!(%key, message_id = %receipt.message_id, "duplicate send suppressed");
            return Ok(receipt.clone());
        }

        let now = self.clock.now();
        let receipt = SendReceipt {
            message_id: format!("m-{}", now.timestamp_millis()),
            timestamp: now,
        };
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            %key,
            message_id = %receipt.message_id,
            "sending message"
        );
        delivered.insert(key.clone(), receipt.clone());
        Ok(receipt)
    }
}
