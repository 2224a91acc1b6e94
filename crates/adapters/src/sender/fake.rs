// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake delivery backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MessageSender, SendError};
use async_trait::async_trait;
use cadence_core::{IdempotencyKey, OutboundMessage, SendReceipt};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// One recorded attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCall {
    pub message: OutboundMessage,
    pub key: IdempotencyKey,
}

#[derive(Default)]
struct FakeSenderState {
    calls: Vec<SendCall>,
    failures: VecDeque<SendError>,
    delivered: HashMap<IdempotencyKey, SendReceipt>,
    delivery_order: Vec<IdempotencyKey>,
    delay: Option<Duration>,
}

/// Fake sender that records attempts and deduplicates by key
///
/// Failures can be scripted ahead of time, each attempt can be delayed, and
/// delivery can be held behind a gate so tests can act while a send is in
/// flight.
#[derive(Clone)]
pub struct FakeSender {
    state: Arc<Mutex<FakeSenderState>>,
    gated: Arc<AtomicBool>,
    gate: Arc<Semaphore>,
}

impl Default for FakeSender {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeSenderState::default())),
            gated: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Semaphore::new(0)),
        }
    }
}

impl FakeSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeSenderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the next attempt with `error`; queued failures apply in order
    pub fn fail_next(&self, error: SendError) {
        self.lock().failures.push_back(error);
    }

    /// Fail the next `count` attempts transiently
    pub fn fail_next_transient(&self, count: usize) {
        let mut state = self.lock();
        for i in 0..count {
            state
                .failures
                .push_back(SendError::Transient(format!("scripted failure {}", i + 1)));
        }
    }

    /// Delay every attempt by `delay` before it resolves
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Hold attempts until released; each attempt is recorded before it waits
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let `count` held attempts through
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Every attempt, in order, including failed ones
    pub fn calls(&self) -> Vec<SendCall> {
        self.lock().calls.clone()
    }

    /// Keys that were delivered, in delivery order, without duplicates
    pub fn delivered(&self) -> Vec<IdempotencyKey> {
        self.lock().delivery_order.clone()
    }

    /// Subjects of delivered messages, in delivery order
    pub fn delivered_subjects(&self) -> Vec<String> {
        let state = self.lock();
        state
            .delivery_order
            .iter()
            .filter_map(|key| {
                state
                    .calls
                    .iter()
                    .find(|call| &call.key == key)
                    .map(|call| call.message.subject.clone())
            })
            .collect()
    }

    /// Mark a key delivered without an attempt, as a backend would after a
    /// send that succeeded just before a crash
    pub fn preload_delivered(&self, key: IdempotencyKey) {
        let mut state = self.lock();
        let receipt = SendReceipt {
            message_id: format!("fake-{}", state.delivered.len() + 1),
            timestamp: Utc::now(),
        };
        state.delivered.insert(key.clone(), receipt);
        state.delivery_order.push(key);
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send(
        &self,
        message: &OutboundMessage,
        key: &IdempotencyKey,
    ) -> Result<SendReceipt, SendError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(SendCall {
                message: message.clone(),
                key: key.clone(),
            });
            state.delay
        };

        if self.gated.load(Ordering::SeqCst) {
            match self.gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(SendError::Transient("gate closed".to_string())),
            }
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        if let Some(receipt) = state.delivered.get(key) {
            return Ok(receipt.clone());
        }

        let receipt = SendReceipt {
            message_id: format!("fake-{}", state.delivered.len() + 1),
            timestamp: Utc::now(),
        };
        state.delivered.insert(key.clone(), receipt.clone());
        state.delivery_order.push(key.clone());
        Ok(receipt)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
