//! HTTP request handlers for the server.
//!
//! Routes are grouped by concern: `medical` runs queries and the explicit
//! encryption endpoints, `attestation` serves proofs, `audit` reads the log
//! back. Shared state and the error type live here.

pub mod attestation;
pub mod audit;
pub mod medical;

use crate::audit_io::append_entry;
use crate::config::ServerConfig;
use crate::pipeline::{PipelineError, PipelineSettings, QueryPipeline};
use crate::ServerError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use chrono::{DateTime, Utc};
use medveil_audit::redact::anonymize_ip;
use medveil_audit::{AuditBackend, AuditError, AuditLog};
use medveil_crypto::{
    AttestationError, AttestationService, CipherContext, CryptoError, ProofSource,
};
use medveil_domain::{AuditEntry, EventType};
use medveil_extractor::KeywordExtractor;
use medveil_literature::{LiteratureSource, PubMedClient};
use medveil_llm::{InferenceError, InferenceProvider};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Process-wide encryption key
    pub cipher: Arc<CipherContext>,
    /// Inference provider
    pub provider: Arc<dyn InferenceProvider>,
    /// Literature source
    pub literature: Arc<dyn LiteratureSource>,
    /// Audit log
    pub audit: Arc<dyn AuditLog>,
    /// Attestation proofs
    pub attestation: Arc<AttestationService>,
    /// Query pipeline over the components above
    pub pipeline: Arc<QueryPipeline>,
}

impl AppState {
    /// Build every component named in configuration
    pub fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        let provider = medveil_llm::provider_from_config(&config.inference)
            .map_err(|e| ServerError::Startup(format!("inference provider: {}", e)))?;
        let literature = PubMedClient::new(config.literature.clone())
            .map_err(|e| ServerError::Startup(format!("literature client: {}", e)))?;
        let audit = medveil_audit::open_store(&config.audit)
            .map_err(|e| ServerError::Startup(format!("audit log: {}", e)))?;

        Self::with_components(config, provider, Arc::new(literature), audit)
    }

    /// Build state around externally supplied provider, literature and audit
    pub fn with_components(
        config: ServerConfig,
        provider: Arc<dyn InferenceProvider>,
        literature: Arc<dyn LiteratureSource>,
        audit: Arc<dyn AuditLog>,
    ) -> Result<Self, ServerError> {
        let cipher = match config.encryption.key.as_deref() {
            Some(key) => CipherContext::from_base64_key(key)
                .map_err(|e| ServerError::Startup(format!("encryption key: {}", e)))?,
            None => {
                warn!("No encryption key configured; sealed payloads will not survive a restart");
                CipherContext::generate()
            }
        };
        let cipher = Arc::new(cipher);

        let extractor = KeywordExtractor::with_config(&config.extractor)
            .map_err(|e| ServerError::Startup(format!("keyword extractor: {}", e)))?;
        let attestation = AttestationService::new(config.attestation.clone())
            .map_err(|e| ServerError::Startup(format!("attestation: {}", e)))?;
        let attestation = Arc::new(attestation);

        let pipeline = QueryPipeline::new(
            provider.clone(),
            literature.clone(),
            Arc::new(extractor),
            cipher.clone(),
            attestation.clone(),
            audit.clone(),
            PipelineSettings::from_config(&config),
        );

        Ok(Self {
            config: Arc::new(config),
            cipher,
            provider,
            literature,
            audit,
            attestation,
            pipeline: Arc::new(pipeline),
        })
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// "healthy", or "degraded" when inference cannot be served
    pub status: String,
    /// Service version
    pub version: String,
    /// Whether an inference credential is configured
    pub inference_configured: bool,
    /// Model queries go to
    pub model: String,
    /// Audit storage backend
    pub audit_backend: AuditBackend,
    /// Attestation source
    pub attestation_source: ProofSource,
    /// Response time
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Status returned by an upstream service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Body returned by an upstream service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_body: Option<String>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed client input
    BadRequest(String),
    /// Service cannot handle requests as configured
    Unavailable(String),
    /// Upstream service failed
    Upstream {
        /// Error message
        message: String,
        /// Upstream status, when one was received
        status: Option<u16>,
        /// Upstream body, when one was received
        body: Option<String>,
    },
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, upstream_status, upstream_body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None, None),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None, None),
            AppError::Upstream {
                message,
                status,
                body,
            } => (StatusCode::BAD_GATEWAY, message, status, body),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None, None),
        };

        let body = Json(ErrorResponse {
            error,
            upstream_status,
            upstream_body,
        });
        (status, body).into_response()
    }
}

impl From<InferenceError> for AppError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::MissingCredential => AppError::Unavailable(
                "Inference API credential is not configured; set NILLION_API_KEY".to_string(),
            ),
            InferenceError::Upstream { status, body } => AppError::Upstream {
                message: format!("Inference API returned HTTP {}", status),
                status: Some(status),
                body: Some(body),
            },
            other => AppError::Upstream {
                message: other.to_string(),
                status: None,
                body: None,
            },
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Inference(inner) => inner.into(),
            PipelineError::InvalidQuery(_) | PipelineError::Decrypt(_) => {
                AppError::BadRequest(e.to_string())
            }
            PipelineError::Encrypt(_) | PipelineError::Audit(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<CryptoError> for AppError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Encryption | CryptoError::InvalidKey(_) => {
                AppError::Internal(e.to_string())
            }
            _ => AppError::BadRequest(e.to_string()),
        }
    }
}

impl From<AttestationError> for AppError {
    fn from(e: AttestationError) -> Self {
        match e {
            AttestationError::InvalidProof(_) | AttestationError::Serialization(_) => {
                AppError::BadRequest(e.to_string())
            }
            AttestationError::RemoteStatus { status, ref body } => AppError::Upstream {
                message: format!("Attestation endpoint returned HTTP {}", status),
                status: Some(status),
                body: Some(body.clone()),
            },
            AttestationError::Remote(_) => AppError::Upstream {
                message: e.to_string(),
                status: None,
                body: None,
            },
        }
    }
}

impl From<AuditError> for AppError {
    fn from(e: AuditError) -> Self {
        AppError::Internal(format!("Audit log unavailable: {}", e))
    }
}

/// GET /health - Service health
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let inference_configured = state.provider.has_credential();

    Json(HealthCheckResponse {
        status: if inference_configured { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        inference_configured,
        model: state.provider.model().to_string(),
        audit_backend: state.audit.backend(),
        attestation_source: state.attestation.source(),
        timestamp: Utc::now(),
    })
}

/// Record one `api_request` entry per HTTP request
async fn audit_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| anonymize_ip(&addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let entry = AuditEntry::new(EventType::ApiRequest)
        .with_detail("method", method)
        .with_detail("path", path)
        .with_detail("status", response.status().as_u16())
        .with_detail("duration_ms", duration_ms)
        .with_detail("client_ip", client_ip);
    if let Err(e) = append_entry(&state.audit, entry).await {
        warn!(error = %e, "Failed to record API request");
    }
    response
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    let mut router = AxumRouter::new()
        .route("/health", get(health_check))
        .route("/api/medical/query", post(medical::process_query))
        .route("/api/medical/status", get(medical::service_status))
        .route("/api/medical/encrypt", post(medical::encrypt))
        .route("/api/medical/decrypt", post(medical::decrypt))
        .route("/api/medical/demo/sample-query", post(medical::sample_query))
        .route("/api/attestation/proof", get(attestation::proof))
        .route("/api/attestation/verify", post(attestation::verify))
        .route("/api/attestation/status", get(attestation::status))
        .route("/api/audit/logs", get(audit::logs))
        .route("/api/audit/summary", get(audit::summary))
        .route("/api/audit/compliance-report", get(audit::compliance))
        .route("/api/audit/events", post(audit::record_event));

    if state.config.audit.log_requests {
        router = router.layer(middleware::from_fn_with_state(state.clone(), audit_requests));
    }

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use medveil_audit::{AuditFilter, MemoryAuditStore};
    use medveil_literature::MockLiteratureSource;
    use medveil_llm::MockProvider;
    use tower::ServiceExt;

    fn create_test_state(
        provider: MockProvider,
        log_requests: bool,
    ) -> (AppState, Arc<MemoryAuditStore>) {
        let mut config = ServerConfig::default_test_config();
        config.audit.log_requests = log_requests;
        let audit = Arc::new(MemoryAuditStore::new());
        let state = AppState::with_components(
            config,
            Arc::new(provider),
            Arc::new(MockLiteratureSource::new()),
            audit.clone(),
        )
        .unwrap();
        (state, audit)
    }

    async fn get_health(app: AxumRouter) -> HealthCheckResponse {
        let response = app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _) = create_test_state(MockProvider::default(), false);
        let health = get_health(create_router(state)).await;

        assert_eq!(health.status, "healthy");
        assert!(health.inference_configured);
        assert_eq!(health.audit_backend, AuditBackend::Memory);
        assert_eq!(health.attestation_source, ProofSource::Local);
    }

    #[tokio::test]
    async fn test_health_degraded_without_credential() {
        let (state, _) = create_test_state(MockProvider::default().without_credential(), false);
        let health = get_health(create_router(state)).await;
        assert_eq!(health.status, "degraded");
    }

    #[tokio::test]
    async fn test_request_audit_middleware() {
        let (state, audit) = create_test_state(MockProvider::default(), true);
        get_health(create_router(state)).await;

        let entries = audit
            .entries(&AuditFilter::default().with_event_type(EventType::ApiRequest))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].details["path"], "/health");
        assert_eq!(entries[0].details["status"], 200);
        assert_eq!(entries[0].details["client_ip"], "unknown");
    }

    #[tokio::test]
    async fn test_request_audit_off_by_default() {
        let (state, audit) = create_test_state(MockProvider::default(), false);
        get_health(create_router(state)).await;
        assert!(audit.is_empty());
    }

    #[test]
    fn test_error_mapping() {
        let missing: AppError = InferenceError::MissingCredential.into();
        assert!(matches!(missing, AppError::Unavailable(_)));

        let upstream: AppError = InferenceError::Upstream {
            status: 429,
            body: "rate limited".to_string(),
        }
        .into();
        assert!(matches!(
            upstream,
            AppError::Upstream {
                status: Some(429),
                ..
            }
        ));

        let bad_cipher: AppError = CryptoError::Authentication.into();
        assert!(matches!(bad_cipher, AppError::BadRequest(_)));

        let bad_proof: AppError = AttestationError::InvalidProof("x".to_string()).into();
        assert!(matches!(bad_proof, AppError::BadRequest(_)));
    }
}
