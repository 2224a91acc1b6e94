// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_records::{advanced, history, started};
use std::io::Write as _;
use tempfile::TempDir;

fn temp_wal_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("enr-1.wal");
    (dir, path)
}

fn write_all(path: &Path, records: &[DurableRecord]) {
    let mut writer = WalWriter::open(path).unwrap();
    for record in records {
        writer.append(record).unwrap();
    }
}

#[test]
fn writer_creates_new_file() {
    let (_dir, path) = temp_wal_path();
    let writer = WalWriter::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(writer.next_sequence(), 0);
}

#[test]
fn writer_persists_one_line_per_record() {
    let (_dir, path) = temp_wal_path();
    write_all(&path, &history("enr-1", 2));

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.ends_with('\n'));
}

#[test]
fn sequence_continues_after_reopen() {
    let (_dir, path) = temp_wal_path();
    let records = history("enr-1", 1);
    write_all(&path, &records);

    let mut writer = WalWriter::open(&path).unwrap();
    assert_eq!(writer.next_sequence(), 2);
    writer.append(&advanced(&records[1])).unwrap();
    assert_eq!(writer.next_sequence(), 3);
}

#[test]
fn append_rejects_sequence_gap() {
    let (_dir, path) = temp_wal_path();
    let mut writer = WalWriter::open(&path).unwrap();
    let first = started("enr-1");
    writer.append(&first).unwrap();

    let mut skipped = advanced(&first);
    skipped.sequence = 5;
    let err = writer.append(&skipped).unwrap_err();
    assert!(matches!(
        err,
        WalError::SequenceGap {
            expected: 1,
            got: 5
        }
    ));

    // Replaying an already-written sequence is also a gap
    let err = writer.append(&first).unwrap_err();
    assert!(matches!(err, WalError::SequenceGap { .. }));
    assert_eq!(writer.next_sequence(), 1);
}

#[test]
fn reader_returns_records_in_order() {
    let (_dir, path) = temp_wal_path();
    let records = history("enr-1", 2);
    write_all(&path, &records);

    let reader = WalReader::open(&path);
    assert_eq!(reader.records_from(0).unwrap(), records);
    assert_eq!(reader.records_from(2).unwrap(), records[2..].to_vec());
    assert_eq!(reader.last().unwrap(), records.last().cloned());
}

#[test]
fn reader_on_missing_file_is_empty() {
    let reader = WalReader::open(Path::new("/nonexistent/path/enr.wal"));
    assert!(reader.records_from(0).unwrap().is_empty());
    assert_eq!(reader.last().unwrap(), None);
}

#[test]
fn torn_tail_is_ignored_on_read() {
    let (_dir, path) = temp_wal_path();
    let records = history("enr-1", 1);
    write_all(&path, &records);

    // Simulate a crash halfway through writing the next entry
    let torn = WalEntry::new(advanced(&records[1])).to_line().unwrap();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&torn.as_bytes()[..torn.len() / 2]).unwrap();

    let reader = WalReader::open(&path);
    assert_eq!(reader.records_from(0).unwrap(), records);
}

#[test]
fn reopen_truncates_torn_tail() {
    let (_dir, path) = temp_wal_path();
    let records = history("enr-1", 1);
    write_all(&path, &records);
    let valid_len = std::fs::metadata(&path).unwrap().len();

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"sequence\":2,\"timest").unwrap();
    drop(file);

    let mut writer = WalWriter::open(&path).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), valid_len);
    assert_eq!(writer.next_sequence(), 2);

    // New appends land after the valid prefix
    writer.append(&advanced(&records[1])).unwrap();
    assert_eq!(WalReader::open(&path).records_from(0).unwrap().len(), 3);
}

#[test]
fn checksum_mismatch_ends_valid_prefix() {
    let (_dir, path) = temp_wal_path();
    let records = history("enr-1", 2);
    write_all(&path, &records);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let mut entry = WalEntry::from_line(lines[1]).unwrap();
    entry.record.state.current_step_index = 9;
    let rewritten = format!(
        "{}\n{}\n{}\n",
        lines[0],
        entry.to_line().unwrap(),
        lines[2]
    );
    std::fs::write(&path, rewritten).unwrap();

    let reader = WalReader::open(&path);
    assert_eq!(reader.records_from(0).unwrap(), records[..1].to_vec());

    let writer = WalWriter::open(&path).unwrap();
    assert_eq!(writer.next_sequence(), 1);
}
