// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod cadence;
pub mod daemon;
pub mod enrollment;

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

/// Read a JSON document from `path`, or stdin when `path` is `-`
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
