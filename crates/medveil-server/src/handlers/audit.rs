//! Audit log endpoints

use super::{AppError, AppState};
use crate::audit_io::{append_entry, read_entries};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, Duration, Utc};
use medveil_audit::redact::{bounded_preview, hash_identifier, sanitize_metadata};
use medveil_audit::{compliance_report, summarize, AuditFilter, AuditSummary, ComplianceReport};
use medveil_domain::{AuditEntry, EventType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DEFAULT_HOURS: i64 = 24;
const MAX_HOURS: i64 = 168;
const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;
const MAX_EVENT_NAME_CHARS: usize = 64;

/// Query parameters of `GET /api/audit/logs`
#[derive(Debug, Default, Deserialize)]
pub struct LogsParams {
    /// Window length in hours (1-168)
    pub hours: Option<i64>,
    /// Event type wire name
    pub event_type: Option<String>,
    /// Maximum entries (1-1000)
    pub limit: Option<usize>,
}

/// Query parameters of the summary endpoints
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    /// Window length in hours (1-168)
    pub hours: Option<i64>,
}

/// Result of `GET /api/audit/logs`
#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    /// Entries, most recent first
    pub entries: Vec<AuditEntry>,
    /// Number of entries returned
    pub total_count: usize,
    /// Window start
    pub period_start: DateTime<Utc>,
    /// Window end
    pub period_end: DateTime<Utc>,
}

/// Body of `POST /api/audit/events`
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientEventRequest {
    /// Event name chosen by the client
    pub event: String,
    /// Client session identifier
    #[serde(default)]
    pub session_id: Option<String>,
    /// Non-identifying metadata; free-text fields are dropped
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Result of `POST /api/audit/events`
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientEventResponse {
    /// Always "recorded"
    pub status: String,
    /// Metadata keys kept after sanitizing
    pub kept_fields: usize,
    /// Entry timestamp
    pub timestamp: DateTime<Utc>,
}

fn window(hours: Option<i64>) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let hours = hours.unwrap_or(DEFAULT_HOURS);
    if !(1..=MAX_HOURS).contains(&hours) {
        return Err(AppError::BadRequest(format!(
            "hours must be between 1 and {}",
            MAX_HOURS
        )));
    }
    let end = Utc::now();
    Ok((end - Duration::hours(hours), end))
}

async fn summary_for(state: &AppState, hours: Option<i64>) -> Result<AuditSummary, AppError> {
    let (start, end) = window(hours)?;
    let filter = AuditFilter {
        since: Some(start),
        until: Some(end),
        ..AuditFilter::default()
    };
    let entries = read_entries(&state.audit, filter).await?;
    Ok(summarize(&entries, start, end))
}

/// GET /api/audit/logs - Entries in a time window
pub async fn logs(
    State(state): State<AppState>,
    params: Result<Query<LogsParams>, QueryRejection>,
) -> Result<Json<LogsResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let (start, end) = window(params.hours)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    let event_type = params
        .event_type
        .as_deref()
        .map(|name| name.parse::<EventType>().map_err(AppError::BadRequest))
        .transpose()?;

    let filter = AuditFilter {
        since: Some(start),
        until: Some(end),
        event_type,
        limit: Some(limit),
    };
    let entries = read_entries(&state.audit, filter).await?;

    Ok(Json(LogsResponse {
        total_count: entries.len(),
        entries,
        period_start: start,
        period_end: end,
    }))
}

/// GET /api/audit/summary - Aggregates over a time window
pub async fn summary(
    State(state): State<AppState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<Json<AuditSummary>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(summary_for(&state, params.hours).await?))
}

/// GET /api/audit/compliance-report - Findings derived from the summary
pub async fn compliance(
    State(state): State<AppState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> Result<Json<ComplianceReport>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let summary = summary_for(&state, params.hours).await?;
    Ok(Json(compliance_report(
        summary,
        state.config.audit.preview_chars,
    )))
}

/// POST /api/audit/events - Record a client-submitted event
pub async fn record_event(
    State(state): State<AppState>,
    payload: Result<Json<ClientEventRequest>, JsonRejection>,
) -> Result<Json<ClientEventResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let name = request.event.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("event must not be empty".to_string()));
    }

    let metadata = sanitize_metadata(&request.metadata);
    let kept_fields = metadata.len();
    let mut entry = AuditEntry::new(EventType::ClientEvent)
        .with_detail("event", bounded_preview(name, MAX_EVENT_NAME_CHARS))
        .with_detail("metadata", Value::Object(metadata));
    if let Some(session_id) = request.session_id.as_deref() {
        entry = entry.with_session_hash(hash_identifier(session_id));
    }
    let timestamp = entry.timestamp;
    append_entry(&state.audit, entry).await?;

    Ok(Json(ClientEventResponse {
        status: "recorded".to_string(),
        kept_fields,
        timestamp,
    }))
}
