//! MedVeil Audit Log
//!
//! Append-only storage for [`AuditEntry`] records, plus the aggregation and
//! redaction helpers the HTTP layer builds reports from.
//!
//! # Backends
//!
//! - `JsonlAuditStore`: one `audit_YYYYMMDD.jsonl` file per UTC day
//! - `MemoryAuditStore`: in-process, for tests and throwaway demos
//!
//! Both serialize writers behind a mutex so concurrent requests never
//! interleave partial lines.
//!
//! # Examples
//!
//! ```
//! use medveil_audit::{AuditFilter, AuditLog, MemoryAuditStore};
//! use medveil_domain::{AuditEntry, EventType};
//!
//! let store = MemoryAuditStore::new();
//! store.append(&AuditEntry::new(EventType::MedicalQuery)).unwrap();
//! let recent = store.entries(&AuditFilter::last_hours(24)).unwrap();
//! assert_eq!(recent.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod jsonl;
pub mod memory;
pub mod redact;
pub mod summary;

use chrono::{DateTime, Duration, Utc};
use medveil_domain::{AuditEntry, EventType};
use std::sync::Arc;

pub use config::{AuditBackend, AuditConfig};
pub use error::AuditError;
pub use jsonl::JsonlAuditStore;
pub use memory::MemoryAuditStore;
pub use summary::{
    compliance_report, summarize, AuditSummary, ComplianceFinding, ComplianceReport, FindingStatus,
};

/// Selection criteria for reading entries back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    /// Earliest timestamp, inclusive
    pub since: Option<DateTime<Utc>>,
    /// Latest timestamp, inclusive
    pub until: Option<DateTime<Utc>>,
    /// Restrict to one event type
    pub event_type: Option<EventType>,
    /// Maximum entries returned
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Entries from the last `hours` hours
    pub fn last_hours(hours: i64) -> Self {
        Self {
            since: Some(Utc::now() - Duration::hours(hours)),
            ..Self::default()
        }
    }

    /// Restrict to one event type
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Cap the number of entries returned
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an entry passes the filter (ignoring the limit)
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.since.map_or(true, |since| entry.timestamp >= since)
            && self.until.map_or(true, |until| entry.timestamp <= until)
            && self.event_type.map_or(true, |t| entry.event_type == t)
    }

    /// Filter, order most recent first, then truncate to the limit
    pub fn apply<I>(&self, entries: I) -> Vec<AuditEntry>
    where
        I: IntoIterator<Item = AuditEntry>,
    {
        let mut selected: Vec<AuditEntry> =
            entries.into_iter().filter(|e| self.matches(e)).collect();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Append-only audit storage
pub trait AuditLog: Send + Sync {
    /// Persist one entry
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Read entries matching a filter, most recent first
    fn entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError>;

    /// Backend name for status output
    fn backend(&self) -> AuditBackend;
}

/// Open the backend named in configuration
pub fn open_store(config: &AuditConfig) -> Result<Arc<dyn AuditLog>, AuditError> {
    match config.backend {
        AuditBackend::Jsonl => Ok(Arc::new(JsonlAuditStore::open(&config.dir)?)),
        AuditBackend::Memory => Ok(Arc::new(MemoryAuditStore::new())),
    }
}
