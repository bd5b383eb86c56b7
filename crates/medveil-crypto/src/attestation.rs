//! Attestation proofs and integrity-only verification
//!
//! No hardware root of trust is available to this service, so verification
//! covers what can actually be computed: the report digest, the measurements
//! against configured expectations, and freshness. Every outcome reports
//! `hardware_signature_checked: false` and the trust level is at most
//! [`TrustLevel::IntegrityOnly`].

use crate::error::AttestationError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Document type tag of locally produced reports
pub const DOCUMENT_TYPE: &str = "TEE_Attestation";

/// Document format version
pub const DOCUMENT_VERSION: &str = "1.0";

/// Tolerated clock skew for reports stamped in the future
const MAX_FUTURE_SKEW_SECS: i64 = 60;

/// Attestation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// TEE family named in reports
    #[serde(default = "default_tee_type")]
    pub tee_type: String,

    /// Expected enclave image hash
    #[serde(default = "default_enclave_hash")]
    pub enclave_hash: String,

    /// Expected application code hash
    #[serde(default = "default_code_hash")]
    pub code_hash: String,

    /// Expected platform measurements (PCR name → hex value)
    #[serde(default = "default_measurements")]
    pub measurements: BTreeMap<String, String>,

    /// Remote report endpoint; when set, reports are passed through from it
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Maximum accepted report age
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Timeout for the remote fetch
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tee_type() -> String {
    "AWS_Nitro_Enclaves".to_string()
}

fn default_enclave_hash() -> String {
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".to_string()
}

fn default_code_hash() -> String {
    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string()
}

fn default_measurements() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "pcr0".to_string(),
            "5f8a3c0e1d7b9a2c4e6f8091a3b5c7d9e1f20314253647586970a1b2c3d4e5f6".to_string(),
        ),
        (
            "pcr1".to_string(),
            "0c1d2e3f405162738495a6b7c8d9eaf00112233445566778899aabbccddeeff0".to_string(),
        ),
        (
            "pcr2".to_string(),
            "a0b1c2d3e4f5061728394a5b6c7d8e9f00ffeeddccbbaa998877665544332211".to_string(),
        ),
    ])
}

fn default_max_age_secs() -> u64 {
    3600
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            tee_type: default_tee_type(),
            enclave_hash: default_enclave_hash(),
            code_hash: default_code_hash(),
            measurements: default_measurements(),
            remote_url: None,
            max_age_secs: default_max_age_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where a proof came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofSource {
    /// Built by this service from configured measurements
    Local,
    /// Passed through from the remote attestation endpoint
    Remote,
}

/// Report body carried inside `proof_data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationDocument {
    /// Document type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Format version
    pub version: String,
    /// Report identifier
    pub proof_id: String,
    /// When the report was produced
    pub timestamp: DateTime<Utc>,
    /// TEE family
    pub tee_type: String,
    /// Enclave image hash
    pub enclave_hash: String,
    /// Application code hash
    pub code_hash: String,
    /// Platform measurements
    pub measurements: BTreeMap<String, String>,
    /// SHA-256 over the fields above
    pub report_digest: String,
    /// Hardware signature, when a TEE provides one
    #[serde(default)]
    pub hardware_signature: Option<String>,
}

impl AttestationDocument {
    /// Digest over the canonical field encoding
    pub fn compute_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.kind.as_str(),
            self.version.as_str(),
            self.proof_id.as_str(),
            &self.timestamp.to_rfc3339(),
            self.tee_type.as_str(),
            self.enclave_hash.as_str(),
            self.code_hash.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"|");
        }
        for (name, value) in &self.measurements {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())
    }
}

/// Attestation proof as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationProof {
    /// Report identifier
    pub proof_id: String,
    /// Origin of the report
    pub source: ProofSource,
    /// TEE family, when known
    pub tee_type: Option<String>,
    /// Enclave hash, when known
    pub enclave_hash: Option<String>,
    /// When the proof was produced or fetched
    pub timestamp: DateTime<Utc>,
    /// Base64-encoded report body
    pub proof_data: String,
    /// Always `false`: no hardware signature is checked by this service
    pub hardware_verified: bool,
}

/// Trust conclusion of a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Structural checks passed; hardware provenance unchecked
    IntegrityOnly,
    /// At least one structural check failed
    None,
}

/// Individual check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChecks {
    /// Recomputed digest equals the embedded one
    pub digest_valid: bool,
    /// Hashes and measurements equal the configured expectations
    pub measurements_match: bool,
    /// Report is within the accepted age window
    pub timestamp_fresh: bool,
    /// Always `false`
    pub hardware_signature_checked: bool,
}

/// Result of verifying a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Report identifier from the document
    pub proof_id: String,
    /// All structural checks passed
    pub structurally_valid: bool,
    /// Trust conclusion
    pub trust_level: TrustLevel,
    /// Individual checks
    pub checks: VerificationChecks,
    /// Verification time
    pub verified_at: DateTime<Utc>,
    /// Human-readable caveat
    pub note: String,
}

/// Attestation service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationStatus {
    /// Service state
    pub status: String,
    /// TEE family
    pub tee_type: String,
    /// Where proofs come from
    pub source: ProofSource,
    /// Always `false`
    pub hardware_verification_available: bool,
    /// Maximum accepted report age
    pub max_age_secs: u64,
    /// Status time
    pub timestamp: DateTime<Utc>,
}

/// Produces and verifies attestation proofs
pub struct AttestationService {
    config: AttestationConfig,
    client: reqwest::Client,
}

impl AttestationService {
    /// Create a service from configuration
    pub fn new(config: AttestationConfig) -> Result<Self, AttestationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AttestationError::Remote(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Borrow the configuration
    pub fn config(&self) -> &AttestationConfig {
        &self.config
    }

    /// Source proofs are drawn from
    pub fn source(&self) -> ProofSource {
        if self.config.remote_url.is_some() {
            ProofSource::Remote
        } else {
            ProofSource::Local
        }
    }

    /// Current proof: remote passthrough if configured, local self-report otherwise
    pub async fn current_proof(&self) -> Result<AttestationProof, AttestationError> {
        match &self.config.remote_url {
            Some(url) => self.fetch_remote(url).await,
            None => self.local_proof_at(Utc::now()),
        }
    }

    /// Build the local self-report for a given instant
    pub fn local_proof_at(&self, now: DateTime<Utc>) -> Result<AttestationProof, AttestationError> {
        let mut document = AttestationDocument {
            kind: DOCUMENT_TYPE.to_string(),
            version: DOCUMENT_VERSION.to_string(),
            proof_id: format!("att_{}", now.format("%Y%m%d%H%M%S")),
            timestamp: now,
            tee_type: self.config.tee_type.clone(),
            enclave_hash: self.config.enclave_hash.clone(),
            code_hash: self.config.code_hash.clone(),
            measurements: self.config.measurements.clone(),
            report_digest: String::new(),
            hardware_signature: None,
        };
        document.report_digest = document.compute_digest();

        let proof_data = STANDARD.encode(serde_json::to_vec(&document)?);

        Ok(AttestationProof {
            proof_id: document.proof_id,
            source: ProofSource::Local,
            tee_type: Some(document.tee_type),
            enclave_hash: Some(document.enclave_hash),
            timestamp: now,
            proof_data,
            hardware_verified: false,
        })
    }

    async fn fetch_remote(&self, url: &str) -> Result<AttestationProof, AttestationError> {
        info!("Fetching remote attestation report");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttestationError::Remote(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AttestationError::Remote(e.to_string()))?;

        if !status.is_success() {
            return Err(AttestationError::RemoteStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        // The remote body is opaque; pick out display fields when they exist.
        let parsed: Option<Value> = serde_json::from_slice(&body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let now = Utc::now();
        Ok(AttestationProof {
            proof_id: field("proof_id").unwrap_or_else(|| format!("remote_{}", now.format("%Y%m%d%H%M%S"))),
            source: ProofSource::Remote,
            tee_type: field("tee_type"),
            enclave_hash: field("enclave_hash"),
            timestamp: now,
            proof_data: STANDARD.encode(&body),
            hardware_verified: false,
        })
    }

    /// Verify a base64 proof payload against configuration at the current time
    pub fn verify(&self, proof_data: &str) -> Result<VerificationOutcome, AttestationError> {
        self.verify_at(proof_data, Utc::now())
    }

    /// Verify a base64 proof payload at a given instant
    ///
    /// # Errors
    /// Returns [`AttestationError::InvalidProof`] when the payload is not
    /// base64, or is neither an attestation document nor a remote JSON report.
    /// Failed checks are not errors; they are reported in the outcome, and a
    /// remote report always comes back with [`TrustLevel::None`].
    pub fn verify_at(
        &self,
        proof_data: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationOutcome, AttestationError> {
        let raw = STANDARD
            .decode(proof_data.trim())
            .map_err(|_| AttestationError::InvalidProof("payload is not valid base64".to_string()))?;

        let document: AttestationDocument = match serde_json::from_slice(&raw) {
            Ok(document) => document,
            Err(e) => {
                return remote_outcome(&raw, now).ok_or_else(|| {
                    AttestationError::InvalidProof(format!("not an attestation document: {}", e))
                })
            }
        };

        let digest_valid = document.compute_digest() == document.report_digest;
        let measurements_match = document.enclave_hash == self.config.enclave_hash
            && document.code_hash == self.config.code_hash
            && document.measurements == self.config.measurements;

        let age = now.signed_duration_since(document.timestamp);
        let max_age = Duration::seconds(self.config.max_age_secs.min(u64::from(u32::MAX)) as i64);
        let timestamp_fresh =
            age <= max_age && age >= Duration::seconds(-MAX_FUTURE_SKEW_SECS);

        let checks = VerificationChecks {
            digest_valid,
            measurements_match,
            timestamp_fresh,
            hardware_signature_checked: false,
        };
        let structurally_valid = digest_valid && measurements_match && timestamp_fresh;

        if !structurally_valid {
            warn!(
                proof_id = %document.proof_id,
                digest_valid,
                measurements_match,
                timestamp_fresh,
                "Attestation proof failed integrity checks"
            );
        }

        Ok(VerificationOutcome {
            proof_id: document.proof_id,
            structurally_valid,
            trust_level: if structurally_valid {
                TrustLevel::IntegrityOnly
            } else {
                TrustLevel::None
            },
            checks,
            verified_at: now,
            note: "Integrity checks only; no hardware root of trust is verified".to_string(),
        })
    }

    /// Service status
    pub fn status(&self) -> AttestationStatus {
        AttestationStatus {
            status: "operational".to_string(),
            tee_type: self.config.tee_type.clone(),
            source: self.source(),
            hardware_verification_available: false,
            max_age_secs: self.config.max_age_secs,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome for a passed-through remote report
///
/// Remote bodies are opaque JSON with no digest this service can recompute,
/// so they are recognised but never trusted. A body tagged as a local
/// document that failed to parse is malformed, not remote.
fn remote_outcome(raw: &[u8], now: DateTime<Utc>) -> Option<VerificationOutcome> {
    let report = serde_json::from_slice::<Value>(raw).ok()?;
    let report = report.as_object()?;
    if report.get("type").and_then(Value::as_str) == Some(DOCUMENT_TYPE) {
        return None;
    }

    let proof_id = ["proof_id", "id"]
        .iter()
        .find_map(|key| report.get(*key).and_then(Value::as_str))
        .unwrap_or("remote")
        .to_string();
    info!(proof_id = %proof_id, "Remote attestation report cannot be verified locally");

    Some(VerificationOutcome {
        proof_id,
        structurally_valid: false,
        trust_level: TrustLevel::None,
        checks: VerificationChecks {
            digest_valid: false,
            measurements_match: false,
            timestamp_fresh: false,
            hardware_signature_checked: false,
        },
        verified_at: now,
        note: "Remote report format not verifiable; passed through without checks".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AttestationService {
        AttestationService::new(AttestationConfig::default()).unwrap()
    }

    fn decode(proof: &AttestationProof) -> AttestationDocument {
        serde_json::from_slice(&STANDARD.decode(&proof.proof_data).unwrap()).unwrap()
    }

    fn encode(document: &AttestationDocument) -> String {
        STANDARD.encode(serde_json::to_vec(document).unwrap())
    }

    #[test]
    fn test_local_proof_passes_integrity_checks() {
        let svc = service();
        let now = Utc::now();
        let proof = svc.local_proof_at(now).unwrap();
        assert_eq!(proof.source, ProofSource::Local);
        assert!(!proof.hardware_verified);
        assert!(proof.proof_id.starts_with("att_"));

        let outcome = svc.verify_at(&proof.proof_data, now).unwrap();
        assert!(outcome.structurally_valid);
        assert_eq!(outcome.trust_level, TrustLevel::IntegrityOnly);
        assert!(!outcome.checks.hardware_signature_checked);
    }

    #[test]
    fn test_tampered_measurement_fails_digest() {
        let svc = service();
        let now = Utc::now();
        let mut document = decode(&svc.local_proof_at(now).unwrap());
        document
            .measurements
            .insert("pcr0".to_string(), "00".repeat(32));

        let outcome = svc.verify_at(&encode(&document), now).unwrap();
        assert!(!outcome.checks.digest_valid);
        assert!(!outcome.checks.measurements_match);
        assert_eq!(outcome.trust_level, TrustLevel::None);
    }

    #[test]
    fn test_consistent_but_unexpected_measurements_fail() {
        let svc = service();
        let now = Utc::now();
        let mut document = decode(&svc.local_proof_at(now).unwrap());
        document.code_hash = "ff".repeat(32);
        document.report_digest = document.compute_digest();

        let outcome = svc.verify_at(&encode(&document), now).unwrap();
        assert!(outcome.checks.digest_valid);
        assert!(!outcome.checks.measurements_match);
        assert!(!outcome.structurally_valid);
    }

    #[test]
    fn test_stale_proof_is_not_fresh() {
        let svc = service();
        let issued = Utc::now() - Duration::hours(3);
        let proof = svc.local_proof_at(issued).unwrap();
        let outcome = svc.verify_at(&proof.proof_data, Utc::now()).unwrap();
        assert!(outcome.checks.digest_valid);
        assert!(!outcome.checks.timestamp_fresh);
        assert_eq!(outcome.trust_level, TrustLevel::None);
    }

    #[test]
    fn test_garbage_payload_is_an_error() {
        let svc = service();
        assert!(matches!(
            svc.verify("%%%"),
            Err(AttestationError::InvalidProof(_))
        ));
        let not_json = STANDARD.encode(b"\x00\x01 not a report");
        assert!(matches!(
            svc.verify(&not_json),
            Err(AttestationError::InvalidProof(_))
        ));
        let json_array = STANDARD.encode(b"[1, 2, 3]");
        assert!(matches!(
            svc.verify(&json_array),
            Err(AttestationError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_truncated_local_document_is_an_error() {
        let svc = service();
        let truncated = STANDARD.encode(br#"{"type":"TEE_Attestation","version":"1.0"}"#);
        assert!(matches!(
            svc.verify(&truncated),
            Err(AttestationError::InvalidProof(_))
        ));
    }

    #[test]
    fn test_remote_report_is_recognised_but_untrusted() {
        let svc = service();
        let now = Utc::now();
        let remote = STANDARD.encode(
            br#"{"proof_id":"nitro-7","tee_type":"AWS_Nitro_Enclaves","document":"opaque"}"#,
        );

        let outcome = svc.verify_at(&remote, now).unwrap();
        assert_eq!(outcome.proof_id, "nitro-7");
        assert!(!outcome.structurally_valid);
        assert_eq!(outcome.trust_level, TrustLevel::None);
        assert!(!outcome.checks.digest_valid);
        assert!(!outcome.checks.hardware_signature_checked);
        assert!(outcome.note.contains("not verifiable"));
        assert_eq!(outcome.verified_at, now);

        let anonymous = STANDARD.encode(br#"{"hello":"world"}"#);
        assert_eq!(svc.verify(&anonymous).unwrap().proof_id, "remote");
    }

    #[test]
    fn test_status_reports_local_source() {
        let status = service().status();
        assert_eq!(status.source, ProofSource::Local);
        assert!(!status.hardware_verification_available);
    }
}
