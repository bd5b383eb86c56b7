//! Audit entry types
//!
//! Entries are append-only and carry no PHI: identifiers are hashed by the
//! producer and free text is limited to bounded previews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Kind of audited event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A completed medical query
    MedicalQuery,
    /// An HTTP request seen by the request-audit middleware
    ApiRequest,
    /// An attestation verification attempt
    AttestationVerification,
    /// An explicit encrypt/decrypt call
    EncryptionOperation,
    /// A failed operation
    Error,
    /// An event submitted by the client
    ClientEvent,
}

impl EventType {
    /// All event types, in display order
    pub const ALL: [EventType; 6] = [
        EventType::MedicalQuery,
        EventType::ApiRequest,
        EventType::AttestationVerification,
        EventType::EncryptionOperation,
        EventType::Error,
        EventType::ClientEvent,
    ];

    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MedicalQuery => "medical_query",
            EventType::ApiRequest => "api_request",
            EventType::AttestationVerification => "attestation_verification",
            EventType::EncryptionOperation => "encryption_operation",
            EventType::Error => "error",
            EventType::ClientEvent => "client_event",
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid event type: {}", s))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the event happened
    pub timestamp: DateTime<Utc>,

    /// What happened
    pub event_type: EventType,

    /// Hashed session identifier, if the event belongs to a session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_hash: Option<String>,

    /// Non-identifying metadata
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time
    pub fn new(event_type: EventType) -> Self {
        Self::at(event_type, Utc::now())
    }

    /// Create an entry with an explicit timestamp
    pub fn at(event_type: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            event_type,
            session_hash: None,
            details: BTreeMap::new(),
        }
    }

    /// Attach an already-hashed session identifier
    pub fn with_session_hash(mut self, hash: impl Into<String>) -> Self {
        self.session_hash = Some(hash.into());
        self
    }

    /// Add one detail field
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Numeric detail as `f64`, if present
    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    /// Boolean detail, if present
    pub fn detail_bool(&self, key: &str) -> Option<bool> {
        self.details.get(key).and_then(Value::as_bool)
    }
}
