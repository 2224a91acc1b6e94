// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_records::started;

#[test]
fn new_entry_verifies() {
    let entry = WalEntry::new(started("enr-1"));
    assert!(entry.verify());
    assert_eq!(entry.sequence, 0);
    assert!(entry.timestamp_micros > 0);
}

#[test]
fn line_roundtrip_preserves_checksum() {
    let entry = WalEntry::with_timestamp(started("enr-1"), 1_000_000);
    let line = entry.to_line().unwrap();
    assert!(!line.contains('\n'));

    let parsed = WalEntry::from_line(&line).unwrap();
    assert_eq!(parsed, entry);
    assert!(parsed.verify());
}

#[test]
fn tampered_record_fails_verification() {
    let mut entry = WalEntry::new(started("enr-1"));
    entry.record.state.current_step_index = 7;
    assert!(!entry.verify());
}

#[test]
fn mismatched_sequence_fails_verification() {
    let mut entry = WalEntry::new(started("enr-1"));
    entry.sequence = 4;
    assert!(!entry.verify());
}

#[test]
fn truncated_line_does_not_parse() {
    let line = WalEntry::new(started("enr-1")).to_line().unwrap();
    assert!(WalEntry::from_line(&line[..line.len() / 2]).is_err());
}
