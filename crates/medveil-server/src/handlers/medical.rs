//! Medical query and encryption endpoints

use super::{AppError, AppState};
use crate::audit_io::append_entry;
use crate::pipeline::{QueryRequest, QueryResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use medveil_audit::redact::hash_identifier;
use medveil_crypto::{cipher::ALGORITHM, EncryptionMetadata, ProofSource, Sealed};
use medveil_domain::{AuditEntry, EventType};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Question returned by the demo endpoint
pub const SAMPLE_QUERY: &str =
    "I have been experiencing chest pain and shortness of breath for the past 2 days. What should I do?";

/// Medical service status
#[derive(Debug, Serialize, Deserialize)]
pub struct MedicalStatusResponse {
    /// "operational", or "degraded" without a credential
    pub status: String,
    /// Model queries go to
    pub model: String,
    /// Whether an inference credential is configured
    pub credential_configured: bool,
    /// Encryption algorithm
    pub encryption_algorithm: String,
    /// Fingerprint of the server key
    pub encryption_key_id: String,
    /// Attestation source
    pub attestation_source: ProofSource,
    /// Response time
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/medical/encrypt`
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Plaintext to seal
    pub data: String,
    /// Session the payload is bound to
    pub session_id: String,
}

/// Body of `POST /api/medical/decrypt`
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptRequest {
    /// Sealed payload
    pub ciphertext: String,
    /// Metadata returned when the payload was sealed
    #[serde(default)]
    pub encryption_metadata: Option<EncryptionMetadata>,
    /// Session the payload was sealed for
    pub session_id: String,
}

/// Result of `POST /api/medical/decrypt`
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// Opened payload
    pub plaintext: String,
    /// Response time
    pub timestamp: DateTime<Utc>,
}

/// Result of `POST /api/medical/demo/sample-query`
#[derive(Debug, Serialize, Deserialize)]
pub struct SampleQueryResponse {
    /// The sample question
    pub plaintext_query: String,
    /// Session the sample is sealed for; submit the query under this id
    pub session_id: String,
    /// The sample question sealed with the server key
    pub encrypted_query: String,
    /// Sealing metadata
    pub encryption_metadata: EncryptionMetadata,
    /// Usage hint
    pub note: String,
    /// Response time
    pub timestamp: DateTime<Utc>,
}

fn encryption_entry(operation: &str, session_id: &str) -> AuditEntry {
    AuditEntry::new(EventType::EncryptionOperation)
        .with_session_hash(hash_identifier(session_id))
        .with_detail("operation", operation)
}

fn require_session(session_id: &str) -> Result<(), AppError> {
    if session_id.trim().is_empty() {
        return Err(AppError::BadRequest("session_id must not be empty".to_string()));
    }
    Ok(())
}

/// POST /api/medical/query - Run the query pipeline
pub async fn process_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = state.pipeline.run(request).await?;
    Ok(Json(response))
}

/// GET /api/medical/status - Model, credential and key status
pub async fn service_status(State(state): State<AppState>) -> Json<MedicalStatusResponse> {
    let credential_configured = state.provider.has_credential();

    Json(MedicalStatusResponse {
        status: if credential_configured {
            "operational"
        } else {
            "degraded"
        }
        .to_string(),
        model: state.provider.model().to_string(),
        credential_configured,
        encryption_algorithm: ALGORITHM.to_string(),
        encryption_key_id: state.cipher.key_id().to_string(),
        attestation_source: state.attestation.source(),
        timestamp: Utc::now(),
    })
}

/// POST /api/medical/encrypt - Seal plaintext with the server key
pub async fn encrypt(
    State(state): State<AppState>,
    payload: Result<Json<EncryptRequest>, JsonRejection>,
) -> Result<Json<Sealed>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if request.data.is_empty() {
        return Err(AppError::BadRequest("data must not be empty".to_string()));
    }
    require_session(&request.session_id)?;

    let sealed = state
        .cipher
        .seal(&request.data, &request.session_id)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let entry = encryption_entry("encrypt", &request.session_id)
        .with_detail("success", true)
        .with_detail("size_bytes", sealed.metadata.size_bytes);
    append_entry(&state.audit, entry).await?;

    Ok(Json(sealed))
}

/// POST /api/medical/decrypt - Open a sealed payload
pub async fn decrypt(
    State(state): State<AppState>,
    payload: Result<Json<DecryptRequest>, JsonRejection>,
) -> Result<Json<DecryptResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    require_session(&request.session_id)?;

    let result = state.cipher.open(
        &request.ciphertext,
        request.encryption_metadata.as_ref(),
        &request.session_id,
    );

    let entry = encryption_entry("decrypt", &request.session_id)
        .with_detail("success", result.is_ok());
    append_entry(&state.audit, entry).await?;

    match result {
        Ok(plaintext) => Ok(Json(DecryptResponse {
            plaintext,
            timestamp: Utc::now(),
        })),
        Err(e) => {
            warn!(error = %e, "Decryption request rejected");
            Err(e.into())
        }
    }
}

/// POST /api/medical/demo/sample-query - Sealed sample question for demos
pub async fn sample_query(
    State(state): State<AppState>,
) -> Result<Json<SampleQueryResponse>, AppError> {
    let session_id = format!("demo_{}", Uuid::now_v7().simple());
    let sealed = state
        .cipher
        .seal(SAMPLE_QUERY, &session_id)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    info!("Generated sample query");

    Ok(Json(SampleQueryResponse {
        plaintext_query: SAMPLE_QUERY.to_string(),
        session_id,
        encrypted_query: sealed.ciphertext,
        encryption_metadata: sealed.metadata,
        note: "Submit encrypted_query with this session_id and encryption_enabled = true to /api/medical/query"
            .to_string(),
        timestamp: Utc::now(),
    }))
}
