//! Audit store access from async code
//!
//! [`AuditLog`] is synchronous and the JSONL store does blocking file I/O, so
//! every call from a handler or the pipeline runs on the blocking pool.

use medveil_audit::{AuditError, AuditFilter, AuditLog};
use medveil_domain::AuditEntry;
use std::sync::Arc;

/// Append one entry without blocking the async worker
pub async fn append_entry(
    audit: &Arc<dyn AuditLog>,
    entry: AuditEntry,
) -> Result<(), AuditError> {
    let audit = Arc::clone(audit);
    tokio::task::spawn_blocking(move || audit.append(&entry))
        .await
        .map_err(|e| AuditError::Task(format!("Task join error: {}", e)))?
}

/// Read entries matching `filter` without blocking the async worker
pub async fn read_entries(
    audit: &Arc<dyn AuditLog>,
    filter: AuditFilter,
) -> Result<Vec<AuditEntry>, AuditError> {
    let audit = Arc::clone(audit);
    tokio::task::spawn_blocking(move || audit.entries(&filter))
        .await
        .map_err(|e| AuditError::Task(format!("Task join error: {}", e)))?
}
