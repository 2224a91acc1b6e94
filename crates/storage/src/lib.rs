// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! cadence-storage: durable enrollment logs and cadence definition stores

mod entry;
mod log;
mod memory;
mod store;
mod wal;

#[cfg(test)]
mod test_records;

pub use entry::WalEntry;
pub use log::{DurabilityLog, FileLog, LogError};
pub use memory::MemoryLog;
pub use store::{CadenceStore, JsonCadenceStore, MemoryCadenceStore, StoreError};
pub use wal::{WalEntryIter, WalError, WalReadError, WalReader, WalWriter};
