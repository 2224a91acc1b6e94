// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for one enrollment
//!
//! Newline-delimited JSON entries, fsync'd on every append. A crash in the
//! middle of an append leaves a torn last line; readers stop at the first
//! entry that fails to parse or verify, and the writer truncates the file
//! back to that point when it reopens.

use crate::entry::WalEntry;
use cadence_core::DurableRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },
}

/// Append-only writer for one WAL file
pub struct WalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Scans existing entries to find the next sequence number and truncates
    /// any invalid tail left by an interrupted append.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut next_sequence = 0;
        if path.exists() {
            let mut iter = WalEntryIter::new(path)?;
            for entry in iter.by_ref() {
                match entry {
                    Ok(entry) => next_sequence = entry.sequence + 1,
                    Err(_) => break,
                }
            }
            let valid_len = iter.last_valid_position();
            let actual_len = std::fs::metadata(path)?.len();
            if valid_len < actual_len {
                tracing::warn!(
                    path = %path.display(),
                    valid_len,
                    actual_len,
                    "truncating invalid WAL tail"
                );
                let file = OpenOptions::new().write(true).open(path)?;
                file.set_len(valid_len)?;
                file.sync_all()?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
        })
    }

    /// Append a record
    ///
    /// The record must carry the next sequence number for this file. It is
    /// durably persisted (fsync'd) before this method returns.
    pub fn append(&mut self, record: &DurableRecord) -> Result<u64, WalError> {
        if record.sequence != self.next_sequence {
            return Err(WalError::SequenceGap {
                expected: self.next_sequence,
                got: record.sequence,
            });
        }

        let entry = WalEntry::new(record.clone());
        let mut line = entry.to_line()?;
        line.push('\n');

        self.file.write_all(line.as_bytes())?;
        self.file.sync_all()?;

        self.next_sequence += 1;
        Ok(record.sequence)
    }

    /// Sequence number the next append must carry
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reader over the valid prefix of a WAL file
pub struct WalReader {
    path: PathBuf,
}

impl WalReader {
    /// Missing files read as empty
    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Iterate over valid entries; stops at the first invalid one
    pub fn entries(&self) -> Result<impl Iterator<Item = WalEntry>, WalError> {
        let iter = if self.path.exists() {
            Some(WalEntryIter::new(&self.path)?)
        } else {
            None
        };
        Ok(iter.into_iter().flatten().map_while(Result::ok))
    }

    /// All valid records with `sequence >= from`
    pub fn records_from(&self, from: u64) -> Result<Vec<DurableRecord>, WalError> {
        Ok(self
            .entries()?
            .filter(|entry| entry.sequence >= from)
            .map(|entry| entry.record)
            .collect())
    }

    /// Last valid record, if any
    pub fn last(&self) -> Result<Option<DurableRecord>, WalError> {
        Ok(self.entries()?.last().map(|entry| entry.record))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Why an entry could not be read
#[derive(Debug, Error)]
pub enum WalReadError {
    #[error("corrupted entry at line {line}: {reason}")]
    Corrupted { line: u64, reason: String },
    #[error("checksum mismatch at line {line}")]
    ChecksumMismatch { line: u64 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Iterator over WAL entries with position tracking
pub struct WalEntryIter {
    reader: BufReader<File>,
    line_number: u64,
    /// Byte offset just past the last valid entry
    last_valid_position: u64,
    failed: bool,
}

impl WalEntryIter {
    fn new(path: &Path) -> Result<Self, io::Error> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            line_number: 0,
            last_valid_position: 0,
            failed: false,
        })
    }

    pub fn last_valid_position(&self) -> u64 {
        self.last_valid_position
    }
}

impl Iterator for WalEntryIter {
    type Item = Result<WalEntry, WalReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut line = String::new();
        let bytes_read = match self.reader.read_line(&mut line) {
            Ok(0) => return None,
            Ok(n) => n,
            Err(e) => {
                self.failed = true;
                return Some(Err(WalReadError::Io(e)));
            }
        };
        self.line_number += 1;

        // A line without its newline was cut short mid-append
        if !line.ends_with('\n') {
            self.failed = true;
            return Some(Err(WalReadError::Corrupted {
                line: self.line_number,
                reason: "incomplete line".to_string(),
            }));
        }

        let entry = match WalEntry::from_line(line.trim_end()) {
            Ok(entry) => entry,
            Err(e) => {
                self.failed = true;
                return Some(Err(WalReadError::Corrupted {
                    line: self.line_number,
                    reason: e.to_string(),
                }));
            }
        };

        if !entry.verify() {
            self.failed = true;
            return Some(Err(WalReadError::ChecksumMismatch {
                line: self.line_number,
            }));
        }

        self.last_valid_position = self
            .reader
            .stream_position()
            .unwrap_or(self.last_valid_position + bytes_read as u64);
        Some(Ok(entry))
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
