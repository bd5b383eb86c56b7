//! Remote attestation passthrough against an in-process endpoint

use axum::{http::StatusCode, routing::get, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use medveil_crypto::{
    AttestationConfig, AttestationError, AttestationService, ProofSource, TrustLevel,
};
use serde_json::json;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn remote_service(url: String) -> AttestationService {
    AttestationService::new(AttestationConfig {
        remote_url: Some(url),
        ..AttestationConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_remote_report_is_passed_through() {
    let app = Router::new().route(
        "/attestation/report",
        get(|| async {
            Json(json!({
                "proof_id": "nitro-7",
                "tee_type": "AWS_Nitro_Enclaves",
                "document": "opaque-cbor-blob"
            }))
        }),
    );
    let base = spawn(app).await;
    let service = remote_service(format!("{}/attestation/report", base));

    let proof = service.current_proof().await.unwrap();
    assert_eq!(proof.source, ProofSource::Remote);
    assert_eq!(proof.proof_id, "nitro-7");
    assert_eq!(proof.tee_type.as_deref(), Some("AWS_Nitro_Enclaves"));
    assert!(!proof.hardware_verified);

    let raw = STANDARD.decode(&proof.proof_data).unwrap();
    let body: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(body["document"], "opaque-cbor-blob");
}

#[tokio::test]
async fn test_issued_remote_proof_verifies_as_untrusted() {
    let app = Router::new().route(
        "/attestation/report",
        get(|| async {
            Json(json!({
                "proof_id": "nitro-8",
                "document": "opaque-cbor-blob"
            }))
        }),
    );
    let base = spawn(app).await;
    let service = remote_service(format!("{}/attestation/report", base));

    let proof = service.current_proof().await.unwrap();
    let outcome = service.verify(&proof.proof_data).unwrap();
    assert_eq!(outcome.proof_id, "nitro-8");
    assert!(!outcome.structurally_valid);
    assert_eq!(outcome.trust_level, TrustLevel::None);
    assert!(outcome.note.contains("not verifiable"));
}

#[tokio::test]
async fn test_remote_error_status_is_surfaced() {
    let app = Router::new().route(
        "/attestation/report",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "enclave offline") }),
    );
    let base = spawn(app).await;
    let service = remote_service(format!("{}/attestation/report", base));

    match service.current_proof().await {
        Err(AttestationError::RemoteStatus { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "enclave offline");
        }
        other => panic!("expected RemoteStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_local_proof_when_no_remote_configured() {
    let service = AttestationService::new(AttestationConfig::default()).unwrap();
    let proof = service.current_proof().await.unwrap();
    assert_eq!(proof.source, ProofSource::Local);

    let outcome = service.verify(&proof.proof_data).unwrap();
    assert!(outcome.structurally_valid);
}
