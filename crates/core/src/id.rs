// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enrollment id allocation

use crate::enrollment::EnrollmentId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Prefix shared by every allocated enrollment id
pub const ENROLLMENT_PREFIX: &str = "enr";

/// Allocates enrollment ids
///
/// Ids double as WAL file names, so implementations must only produce
/// characters that are safe in a path component.
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next_enrollment_id(&self) -> EnrollmentId;
}

/// Random ids for the daemon
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next_enrollment_id(&self) -> EnrollmentId {
        EnrollmentId::new(format!(
            "{}-{}",
            ENROLLMENT_PREFIX,
            uuid::Uuid::new_v4().simple()
        ))
    }
}

/// Predictable ids (`enr-1`, `enr-2`, ...) for tests
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new(ENROLLMENT_PREFIX)
    }
}

impl IdGen for SequentialIdGen {
    fn next_enrollment_id(&self) -> EnrollmentId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        EnrollmentId::new(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique_and_path_safe() {
        let id_gen = UuidIdGen;
        let a = id_gen.next_enrollment_id();
        let b = id_gen.next_enrollment_id();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("enr-"));
        assert!(a
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn clones_share_one_sequence() {
        let first = SequentialIdGen::default();
        let second = first.clone();
        assert_eq!(first.next_enrollment_id().as_str(), "enr-1");
        assert_eq!(second.next_enrollment_id().as_str(), "enr-2");
        assert_eq!(first.next_enrollment_id().as_str(), "enr-3");
    }
}
