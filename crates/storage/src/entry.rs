// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL entry structure with checksum verification
//!
//! Each line of an enrollment's log is one entry: the durable record, the
//! wall-clock time it was written, and a CRC32 of the serialized record.

use cadence_core::DurableRecord;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single entry in an enrollment's write-ahead log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Mirrors `record.sequence`; kept at the top level for cheap scans
    pub sequence: u64,
    /// Microseconds since Unix epoch
    pub timestamp_micros: u64,
    pub record: DurableRecord,
    /// CRC32 checksum of the serialized record
    pub checksum: u32,
}

impl WalEntry {
    pub fn new(record: DurableRecord) -> Self {
        let timestamp_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self::with_timestamp(record, timestamp_micros)
    }

    pub fn with_timestamp(record: DurableRecord, timestamp_micros: u64) -> Self {
        let checksum = Self::calculate_checksum(&record);
        Self {
            sequence: record.sequence,
            timestamp_micros,
            record,
            checksum,
        }
    }

    fn calculate_checksum(record: &DurableRecord) -> u32 {
        let json = serde_json::to_string(record).unwrap_or_default();
        crc32fast::hash(json.as_bytes())
    }

    /// Checksum matches the record and the sequence mirrors it
    pub fn verify(&self) -> bool {
        self.sequence == self.record.sequence
            && self.checksum == Self::calculate_checksum(&self.record)
    }

    /// Serialize to newline-delimited JSON (one line, no trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
