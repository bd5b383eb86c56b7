//! Attestation endpoints

use super::{AppError, AppState};
use crate::audit_io::append_entry;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use medveil_crypto::{AttestationProof, AttestationStatus, VerificationOutcome};
use medveil_domain::{AuditEntry, EventType};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/attestation/verify`
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Base64 proof payload as returned by the proof endpoint
    pub proof_data: String,
}

/// GET /api/attestation/proof - Current attestation proof
pub async fn proof(State(state): State<AppState>) -> Result<Json<AttestationProof>, AppError> {
    let proof = state.attestation.current_proof().await?;
    Ok(Json(proof))
}

/// POST /api/attestation/verify - Integrity-only verification
///
/// Malformed payloads are recorded as failed verifications before the 400.
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerificationOutcome>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    match state.attestation.verify(&request.proof_data) {
        Ok(outcome) => {
            let entry = AuditEntry::new(EventType::AttestationVerification)
                .with_detail("proof_id", outcome.proof_id.as_str())
                .with_detail("structurally_valid", outcome.structurally_valid)
                .with_detail("digest_valid", outcome.checks.digest_valid)
                .with_detail("measurements_match", outcome.checks.measurements_match)
                .with_detail("timestamp_fresh", outcome.checks.timestamp_fresh);
            append_entry(&state.audit, entry).await?;
            Ok(Json(outcome))
        }
        Err(e) => {
            let entry = AuditEntry::new(EventType::AttestationVerification)
                .with_detail("structurally_valid", false)
                .with_detail("malformed", true);
            append_entry(&state.audit, entry).await?;
            Err(e.into())
        }
    }
}

/// GET /api/attestation/status - Attestation source status
pub async fn status(State(state): State<AppState>) -> Json<AttestationStatus> {
    Json(state.attestation.status())
}
