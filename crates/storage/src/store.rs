// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence definition stores
//!
//! Definitions are read once, at enroll time, and copied into the
//! enrollment's snapshot.

use cadence_core::Cadence;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid cadence id: {0:?}")]
    InvalidId(String),
}

/// Keyed read/write access to cadence definitions
pub trait CadenceStore: Send + Sync + 'static {
    fn get(&self, id: &str) -> Result<Option<Cadence>, StoreError>;

    /// Insert or replace by `cadence.id`
    fn put(&self, cadence: &Cadence) -> Result<(), StoreError>;
}

/// Definitions held in process memory
#[derive(Default)]
pub struct MemoryCadenceStore {
    cadences: RwLock<HashMap<String, Cadence>>,
}

impl MemoryCadenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CadenceStore for MemoryCadenceStore {
    fn get(&self, id: &str) -> Result<Option<Cadence>, StoreError> {
        let cadences = self.cadences.read().unwrap_or_else(|e| e.into_inner());
        Ok(cadences.get(id).cloned())
    }

    fn put(&self, cadence: &Cadence) -> Result<(), StoreError> {
        let mut cadences = self.cadences.write().unwrap_or_else(|e| e.into_inner());
        cadences.insert(cadence.id.clone(), cadence.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per cadence
#[derive(Clone)]
pub struct JsonCadenceStore {
    base_path: PathBuf,
}

impl JsonCadenceStore {
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Ids of all stored cadences, sorted
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.base_path.join(format!("{}.json", id)))
    }
}

impl CadenceStore for JsonCadenceStore {
    fn get(&self, id: &str) -> Result<Option<Cadence>, StoreError> {
        let path = self.path_for(id)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn put(&self, cadence: &Cadence) -> Result<(), StoreError> {
        let path = self.path_for(&cadence.id)?;
        let json = serde_json::to_string_pretty(cadence)?;
        // Write-then-rename so readers never see a half-written definition
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
