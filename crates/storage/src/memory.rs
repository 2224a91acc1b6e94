// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory durability log

use crate::log::{DurabilityLog, LogError};
use cadence_core::{DurableRecord, EnrollmentId};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct MemoryLogState {
    records: BTreeMap<EnrollmentId, Vec<DurableRecord>>,
    #[cfg(any(test, feature = "test-support"))]
    fail_appends: usize,
}

impl MemoryLogState {
    #[cfg(any(test, feature = "test-support"))]
    fn take_injected_failure(&mut self) -> bool {
        if self.fail_appends == 0 {
            return false;
        }
        self.fail_appends -= 1;
        true
    }

    #[cfg(not(any(test, feature = "test-support")))]
    fn take_injected_failure(&mut self) -> bool {
        false
    }
}

/// Log kept in process memory; lost on exit
#[derive(Default)]
pub struct MemoryLog {
    inner: Mutex<MemoryLogState>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records committed for an enrollment
    pub fn len(&self, id: &EnrollmentId) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.records.get(id).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryLog {
    /// Make the next `count` appends fail without committing
    pub fn fail_next_appends(&self, count: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.fail_appends = count;
    }
}

impl DurabilityLog for MemoryLog {
    fn append(&self, record: &DurableRecord) -> Result<(), LogError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.take_injected_failure() {
            return Err(LogError::Unavailable("injected append failure".to_string()));
        }

        let records = inner
            .records
            .entry(record.enrollment_id.clone())
            .or_default();
        let expected = records.len() as u64;
        if record.sequence != expected {
            return Err(LogError::SequenceGap {
                enrollment_id: record.enrollment_id.clone(),
                expected,
                got: record.sequence,
            });
        }
        records.push(record.clone());
        Ok(())
    }

    fn read_latest(&self, id: &EnrollmentId) -> Result<Option<DurableRecord>, LogError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.records.get(id).and_then(|r| r.last().cloned()))
    }

    fn replay_from(&self, id: &EnrollmentId, from: u64) -> Result<Vec<DurableRecord>, LogError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .records
            .get(id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.sequence >= from)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn enrollment_ids(&self) -> Result<Vec<EnrollmentId>, LogError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .records
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(id, _)| id.clone())
            .collect())
    }
}
