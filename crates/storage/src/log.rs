// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durability log: committed enrollment transitions
//!
//! A transition is committed once `append` returns `Ok`. Nothing reads state
//! that has not gone through here first.

use crate::wal::{WalError, WalReader, WalWriter};
use cadence_core::{DurableRecord, EnrollmentId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sequence gap for {enrollment_id}: expected {expected}, got {got}")]
    SequenceGap {
        enrollment_id: EnrollmentId,
        expected: u64,
        got: u64,
    },
    #[error("invalid enrollment id for log file: {0:?}")]
    InvalidId(String),
    #[error("log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, per-enrollment record of committed transitions
pub trait DurabilityLog: Send + Sync + 'static {
    /// Durably append a record carrying the enrollment's next sequence number
    fn append(&self, record: &DurableRecord) -> Result<(), LogError>;

    /// Latest committed record, or `None` if the enrollment has none
    fn read_latest(&self, id: &EnrollmentId) -> Result<Option<DurableRecord>, LogError>;

    /// Committed records with `sequence >= from`, in order
    fn replay_from(&self, id: &EnrollmentId, from: u64) -> Result<Vec<DurableRecord>, LogError>;

    /// Every enrollment with at least one record
    fn enrollment_ids(&self) -> Result<Vec<EnrollmentId>, LogError>;
}

const WAL_EXTENSION: &str = "wal";

/// Open writer for one enrollment; `None` until the first append
type WriterSlot = Arc<Mutex<Option<WalWriter>>>;

/// File-backed log: one WAL file per enrollment under a directory
///
/// Each enrollment has its own lock, so appends for different enrollments
/// never wait on each other's fsync. A writer is closed once its enrollment
/// commits a terminal record.
pub struct FileLog {
    dir: PathBuf,
    writers: Mutex<HashMap<EnrollmentId, WriterSlot>>,
}

impl FileLog {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LogError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            writers: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of enrollments holding a writer
    pub fn open_writers(&self) -> usize {
        self.writers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn slot(&self, id: &EnrollmentId) -> WriterSlot {
        let mut writers = self.writers.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(writers.entry(id.clone()).or_default())
    }

    fn existing_slot(&self, id: &EnrollmentId) -> Option<WriterSlot> {
        let writers = self.writers.lock().unwrap_or_else(|e| e.into_inner());
        writers.get(id).cloned()
    }

    fn evict(&self, id: &EnrollmentId) {
        let mut writers = self.writers.lock().unwrap_or_else(|e| e.into_inner());
        writers.remove(id);
    }

    fn path_for(&self, id: &EnrollmentId) -> Result<PathBuf, LogError> {
        let raw = id.as_str();
        let valid = !raw.is_empty()
            && !raw.starts_with('.')
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(LogError::InvalidId(raw.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", raw, WAL_EXTENSION)))
    }
}

impl DurabilityLog for FileLog {
    fn append(&self, record: &DurableRecord) -> Result<(), LogError> {
        let path = self.path_for(&record.enrollment_id)?;
        let slot = self.slot(&record.enrollment_id);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        if guard.is_none() {
            *guard = Some(WalWriter::open(&path)?);
        }
        let Some(writer) = guard.as_mut() else {
            return Err(LogError::Unavailable("writer not registered".to_string()));
        };

        let result = match writer.append(record) {
            Ok(_) => Ok(()),
            // A retry of an append whose fsync failed after the line landed
            Err(WalError::SequenceGap { expected, got })
                if expected == got + 1
                    && WalReader::open(&path).last()?.as_ref() == Some(record) =>
            {
                Ok(())
            }
            Err(WalError::SequenceGap { expected, got }) => Err(LogError::SequenceGap {
                enrollment_id: record.enrollment_id.clone(),
                expected,
                got,
            }),
            Err(e) => {
                // Drop the writer so the next attempt reopens and truncates
                // anything this failed append left behind
                *guard = None;
                Err(e.into())
            }
        };

        // Nothing appends after a terminal record but a late send outcome,
        // which reopens the file
        if result.is_ok() && record.state.is_terminal() {
            *guard = None;
            self.evict(&record.enrollment_id);
        }
        result
    }

    fn read_latest(&self, id: &EnrollmentId) -> Result<Option<DurableRecord>, LogError> {
        let path = self.path_for(id)?;
        let slot = self.existing_slot(id);
        let _guard = slot
            .as_ref()
            .map(|slot| slot.lock().unwrap_or_else(|e| e.into_inner()));
        Ok(WalReader::open(&path).last()?)
    }

    fn replay_from(&self, id: &EnrollmentId, from: u64) -> Result<Vec<DurableRecord>, LogError> {
        let path = self.path_for(id)?;
        let slot = self.existing_slot(id);
        let _guard = slot
            .as_ref()
            .map(|slot| slot.lock().unwrap_or_else(|e| e.into_inner()));
        Ok(WalReader::open(&path).records_from(from)?)
    }

    fn enrollment_ids(&self) -> Result<Vec<EnrollmentId>, LogError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == WAL_EXTENSION).unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    ids.push(EnrollmentId::new(stem.to_string_lossy()));
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
