//! Operation counters
//!
//! Monotonic `AtomicU64` counters, reset only on process start. Relaxed
//! ordering: counters are independent and read only for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    models_defined: AtomicU64,
    models_deleted: AtomicU64,
    fields_deleted: AtomicU64,
    records_created: AtomicU64,
    records_deleted: AtomicU64,
    values_deleted: AtomicU64,
    rejected_not_found: AtomicU64,
    rejected_conflict: AtomicU64,
    rejected_invalid: AtomicU64,
    rejected_type_mismatch: AtomicU64,
    rejected_restricted: AtomicU64,
    storage_failures: AtomicU64,
    commits: AtomicU64,
    journal_entries_replayed: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_models_defined(&self) {
        self.models_defined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_models_deleted(&self) {
        self.models_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fields_deleted(&self) {
        self.fields_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_created(&self) {
        self.records_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_values_deleted(&self) {
        self.values_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one committed batch
    pub fn increment_commits(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records how many journal entries were replayed on open
    pub fn add_journal_entries_replayed(&self, entries: u64) {
        self.journal_entries_replayed.fetch_add(entries, Ordering::Relaxed);
    }

    /// Counts a failed operation under its error kind
    pub fn record_failure(&self, err: &EngineError) {
        let counter = match err {
            EngineError::NotFound { .. } => &self.rejected_not_found,
            EngineError::Conflict { .. } => &self.rejected_conflict,
            EngineError::Invalid { .. } => &self.rejected_invalid,
            EngineError::TypeMismatch(_) => &self.rejected_type_mismatch,
            EngineError::Restricted { .. } => &self.rejected_restricted,
            EngineError::StorageFailure(_) => &self.storage_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            models_defined: load(&self.models_defined),
            models_deleted: load(&self.models_deleted),
            fields_deleted: load(&self.fields_deleted),
            records_created: load(&self.records_created),
            records_deleted: load(&self.records_deleted),
            values_deleted: load(&self.values_deleted),
            rejected_not_found: load(&self.rejected_not_found),
            rejected_conflict: load(&self.rejected_conflict),
            rejected_invalid: load(&self.rejected_invalid),
            rejected_type_mismatch: load(&self.rejected_type_mismatch),
            rejected_restricted: load(&self.rejected_restricted),
            storage_failures: load(&self.storage_failures),
            commits: load(&self.commits),
            journal_entries_replayed: load(&self.journal_entries_replayed),
        }
    }
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub models_defined: u64,
    pub models_deleted: u64,
    pub fields_deleted: u64,
    pub records_created: u64,
    pub records_deleted: u64,
    pub values_deleted: u64,
    pub rejected_not_found: u64,
    pub rejected_conflict: u64,
    pub rejected_invalid: u64,
    pub rejected_type_mismatch: u64,
    pub rejected_restricted: u64,
    pub storage_failures: u64,
    pub commits: u64,
    pub journal_entries_replayed: u64,
}
