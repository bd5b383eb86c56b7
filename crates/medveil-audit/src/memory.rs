//! In-memory audit store

use crate::{AuditBackend, AuditError, AuditFilter, AuditLog};
use medveil_domain::AuditEntry;
use std::sync::{Mutex, PoisonError};

/// Audit store held in process memory
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for MemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }

    fn entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(filter.apply(entries.iter().cloned()))
    }

    fn backend(&self) -> AuditBackend {
        AuditBackend::Memory
    }
}
