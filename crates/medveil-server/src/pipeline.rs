//! Medical query pipeline
//!
//! Runs one query through every stage in order:
//!
//! 1. Credential check (before anything touches the network)
//! 2. Intake: open sealed fields, validate sizes
//! 3. Keyword extraction and literature retrieval (optional)
//! 4. Prompt construction and inference
//! 5. Sealing of the response (optional)
//! 6. Attestation attachment (optional, best effort)
//! 7. Audit write
//!
//! A completed query appends exactly one `medical_query` entry; a failed one
//! appends one `error` entry. If the audit write itself fails the query fails,
//! so no answer leaves the service unaudited.

use crate::audit_io::append_entry;
use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use medveil_audit::redact::{bounded_preview, hash_identifier, sanitize_message};
use medveil_audit::{AuditError, AuditLog};
use medveil_crypto::{
    short_digest, AttestationProof, AttestationService, CipherContext, CryptoError,
    EncryptionMetadata,
};
use medveil_domain::{Article, ArticleSet, AuditEntry, EventType, KeywordSet, Query};
use medveil_extractor::{KeywordExtractor, PromptBuilder};
use medveil_literature::LiteratureSource;
use medveil_llm::{InferenceError, InferenceProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline failure
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Client input rejected at intake
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Sealed input could not be opened
    #[error("Could not open encrypted payload: {0}")]
    Decrypt(CryptoError),

    /// Response could not be sealed
    #[error("Could not seal response: {0}")]
    Encrypt(CryptoError),

    /// Inference provider failure
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Audit write failure
    #[error("Audit log write failed: {0}")]
    Audit(#[from] AuditError),
}

/// Body of `POST /api/medical/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Plaintext question (encryption disabled)
    #[serde(default)]
    pub query: Option<String>,

    /// Sealed question (encryption enabled)
    #[serde(default)]
    pub encrypted_query: Option<String>,

    /// Metadata returned when the question was sealed
    #[serde(default)]
    pub encryption_metadata: Option<EncryptionMetadata>,

    /// Extracted document text (encryption disabled)
    #[serde(default)]
    pub document: Option<String>,

    /// Sealed document text (encryption enabled)
    #[serde(default)]
    pub encrypted_document: Option<String>,

    /// Client session identifier
    pub session_id: String,

    /// Whether input arrives sealed and the answer leaves sealed
    #[serde(default)]
    pub encryption_enabled: bool,

    /// Whether to run literature retrieval
    #[serde(default = "default_true")]
    pub use_literature: bool,

    /// Whether to attach an attestation proof
    #[serde(default)]
    pub request_attestation: bool,
}

fn default_true() -> bool {
    true
}

impl QueryRequest {
    /// Plaintext request for a question
    pub fn plaintext(query: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            session_id: session_id.into(),
            use_literature: true,
            ..Self::default()
        }
    }
}

/// Article as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedArticle {
    /// PubMed identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Journal, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    /// Publication year, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Landing page
    pub url: String,
}

impl From<&Article> for CitedArticle {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            journal: article.journal.clone(),
            year: article.year.clone(),
            url: article.url(),
        }
    }
}

/// Result of a completed query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Identifier shared with the audit entry
    pub query_id: String,
    /// Plaintext answer (encryption disabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Sealed answer (encryption enabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_response: Option<String>,
    /// Sealing metadata for `encrypted_response`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_metadata: Option<EncryptionMetadata>,
    /// Whether the answer is sealed
    pub encryption_enabled: bool,
    /// Model that produced the answer
    pub model: String,
    /// Search terms used; withheld when the answer is sealed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    /// Literature given to the model
    pub articles: Vec<CitedArticle>,
    /// Attestation proof, when requested and available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_proof: Option<AttestationProof>,
    /// Server-side processing time
    pub processing_time_ms: u64,
    /// Completion time
    pub timestamp: DateTime<Utc>,
}

/// Limits the pipeline enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum question length accepted
    pub max_query_chars: usize,
    /// Maximum document length accepted
    pub max_document_chars: usize,
    /// Document characters kept in the prompt
    pub prompt_document_chars: usize,
    /// Query characters kept in the audit preview
    pub preview_chars: usize,
}

impl PipelineSettings {
    /// Settings drawn from server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_query_chars: config.query.max_query_chars,
            max_document_chars: config.query.max_document_chars,
            prompt_document_chars: config.extractor.max_document_chars,
            preview_chars: config.audit.preview_chars,
        }
    }
}

/// The components a query flows through
pub struct QueryPipeline {
    provider: Arc<dyn InferenceProvider>,
    literature: Arc<dyn LiteratureSource>,
    extractor: Arc<KeywordExtractor>,
    cipher: Arc<CipherContext>,
    attestation: Arc<AttestationService>,
    audit: Arc<dyn AuditLog>,
    settings: PipelineSettings,
}

/// Intermediate state of a query that passed intake
struct Intake {
    query: Query,
    preview: String,
    query_hash: String,
}

impl QueryPipeline {
    /// Assemble a pipeline from shared components
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        literature: Arc<dyn LiteratureSource>,
        extractor: Arc<KeywordExtractor>,
        cipher: Arc<CipherContext>,
        attestation: Arc<AttestationService>,
        audit: Arc<dyn AuditLog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            literature,
            extractor,
            cipher,
            attestation,
            audit,
            settings,
        }
    }

    /// Run one query end to end
    pub async fn run(&self, request: QueryRequest) -> Result<QueryResponse, PipelineError> {
        let started = Instant::now();
        let session_hash = hash_identifier(&request.session_id);
        info!(
            session = %session_hash,
            encrypted = request.encryption_enabled,
            use_literature = request.use_literature,
            "Processing medical query"
        );

        match self.process(&request, &session_hash, started).await {
            Ok((response, entry)) => {
                append_entry(&self.audit, entry).await?;
                info!(
                    query_id = %response.query_id,
                    processing_time_ms = response.processing_time_ms,
                    "Medical query complete"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(session = %session_hash, error = %e, "Medical query failed");
                let entry = AuditEntry::new(EventType::Error)
                    .with_session_hash(session_hash)
                    .with_detail("error_type", "medical_query_error")
                    .with_detail("error_message", sanitize_message(&e.to_string()));
                if let Err(audit_err) = append_entry(&self.audit, entry).await {
                    error!(error = %audit_err, "Failed to record query error");
                    return Err(PipelineError::Audit(audit_err));
                }
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        request: &QueryRequest,
        session_hash: &str,
        started: Instant,
    ) -> Result<(QueryResponse, AuditEntry), PipelineError> {
        self.provider.ensure_ready()?;

        let intake = self.intake(request)?;
        let query = &intake.query;

        let (keywords, articles) = if request.use_literature {
            let keywords = self
                .extractor
                .extract(query.document.as_deref(), &query.question);
            let articles = self.literature.search_all(&keywords).await;
            (keywords, articles)
        } else {
            (KeywordSet::new(), ArticleSet::new())
        };
        debug!(
            keywords = keywords.len(),
            articles = articles.len(),
            "Retrieval stage done"
        );

        let messages = PromptBuilder::new(&query.question)
            .with_document(query.document.as_deref(), self.settings.prompt_document_chars)
            .with_articles(articles.as_slice())
            .build();
        let completion = self.provider.complete(&messages).await?;
        let response_length = completion.text.chars().count();

        let (response, encrypted_response, encryption_metadata) = if request.encryption_enabled {
            let sealed = self
                .cipher
                .seal(&completion.text, &request.session_id)
                .map_err(PipelineError::Encrypt)?;
            (None, Some(sealed.ciphertext), Some(sealed.metadata))
        } else {
            (Some(completion.text), None, None)
        };

        let attestation_proof = if request.request_attestation {
            match self.attestation.current_proof().await {
                Ok(proof) => Some(proof),
                Err(e) => {
                    warn!(error = %e, "Attestation unavailable; answering without proof");
                    None
                }
            }
        } else {
            None
        };

        let query_id = format!("query_{}", Uuid::now_v7().simple());
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let entry = AuditEntry::new(EventType::MedicalQuery)
            .with_session_hash(session_hash)
            .with_detail("query_id", query_id.as_str())
            .with_detail("query_preview", intake.preview)
            .with_detail("query_hash", intake.query_hash)
            .with_detail("encryption_enabled", request.encryption_enabled)
            .with_detail("use_literature", request.use_literature)
            .with_detail("keywords_count", keywords.len())
            .with_detail("articles_count", articles.len())
            .with_detail("model", completion.model.as_str())
            .with_detail("response_length", response_length)
            .with_detail("processing_time_ms", processing_time_ms)
            .with_detail("attestation_included", attestation_proof.is_some());

        let response = QueryResponse {
            query_id,
            response,
            encrypted_response,
            encryption_metadata,
            encryption_enabled: request.encryption_enabled,
            model: completion.model,
            keywords: (!request.encryption_enabled).then(|| keywords.into_vec()),
            articles: articles.as_slice().iter().map(CitedArticle::from).collect(),
            attestation_proof,
            processing_time_ms,
            timestamp: Utc::now(),
        };
        Ok((response, entry))
    }

    /// Open sealed fields and validate sizes
    ///
    /// The audit preview is taken from what arrived on the wire: ciphertext
    /// when encryption is enabled, the question otherwise.
    fn intake(&self, request: &QueryRequest) -> Result<Intake, PipelineError> {
        let (question, document, wire) = if request.encryption_enabled {
            if request.query.is_some() || request.document.is_some() {
                return Err(PipelineError::InvalidQuery(
                    "plaintext fields are not accepted when encryption is enabled".to_string(),
                ));
            }
            let sealed = non_blank(request.encrypted_query.as_deref()).ok_or_else(|| {
                PipelineError::InvalidQuery(
                    "encrypted_query is required when encryption is enabled".to_string(),
                )
            })?;
            let metadata = request.encryption_metadata.as_ref();
            let question = self
                .cipher
                .open(sealed, metadata, &request.session_id)
                .map_err(PipelineError::Decrypt)?;
            let document = match non_blank(request.encrypted_document.as_deref()) {
                Some(doc) => Some(
                    self.cipher
                        .open(doc, metadata, &request.session_id)
                        .map_err(PipelineError::Decrypt)?,
                ),
                None => None,
            };
            (question, document, sealed.to_string())
        } else {
            if request.encrypted_query.is_some() || request.encrypted_document.is_some() {
                return Err(PipelineError::InvalidQuery(
                    "encrypted fields require encryption_enabled".to_string(),
                ));
            }
            let question = request.query.clone().unwrap_or_default();
            let wire = question.clone();
            (question, request.document.clone(), wire)
        };

        if question.trim().is_empty() {
            return Err(PipelineError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        let question_chars = question.chars().count();
        if question_chars > self.settings.max_query_chars {
            return Err(PipelineError::InvalidQuery(format!(
                "query is {} characters; the limit is {}",
                question_chars, self.settings.max_query_chars
            )));
        }
        let document_chars = document.as_deref().map_or(0, |d| d.chars().count());
        if document_chars > self.settings.max_document_chars {
            return Err(PipelineError::InvalidQuery(format!(
                "document is {} characters; the limit is {}",
                document_chars, self.settings.max_document_chars
            )));
        }

        let mut query = Query::new(question, request.session_id.as_str());
        if let Some(document) = document {
            query = query.with_document(document);
        }

        Ok(Intake {
            preview: bounded_preview(&wire, self.settings.preview_chars),
            query_hash: short_digest(query.combined_text().as_bytes()),
            query,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medveil_audit::{AuditBackend, AuditFilter, MemoryAuditStore};
    use medveil_crypto::AttestationConfig;
    use medveil_literature::MockLiteratureSource;
    use medveil_llm::MockProvider;

    struct Harness {
        pipeline: QueryPipeline,
        provider: MockProvider,
        literature: MockLiteratureSource,
        audit: Arc<MemoryAuditStore>,
        cipher: Arc<CipherContext>,
    }

    fn harness_with(
        provider: MockProvider,
        literature: MockLiteratureSource,
        attestation: AttestationConfig,
    ) -> Harness {
        let audit = Arc::new(MemoryAuditStore::new());
        let cipher = Arc::new(CipherContext::generate());
        let config = ServerConfig::default_test_config();
        let pipeline = QueryPipeline::new(
            Arc::new(provider.clone()),
            Arc::new(literature.clone()),
            Arc::new(KeywordExtractor::new().unwrap()),
            cipher.clone(),
            Arc::new(AttestationService::new(attestation).unwrap()),
            audit.clone(),
            PipelineSettings::from_config(&config),
        );
        Harness {
            pipeline,
            provider,
            literature,
            audit,
            cipher,
        }
    }

    fn harness() -> Harness {
        harness_with(
            MockProvider::new("Seek care if symptoms worsen."),
            MockLiteratureSource::new(),
            AttestationConfig::default(),
        )
    }

    fn entries(h: &Harness, event_type: EventType) -> Vec<AuditEntry> {
        h.audit
            .entries(&AuditFilter::default().with_event_type(event_type))
            .unwrap()
    }

    #[tokio::test]
    async fn test_literature_disabled_skips_search() {
        let h = harness();
        let mut request = QueryRequest::plaintext("I have chest pain", "s-1");
        request.use_literature = false;

        let response = h.pipeline.run(request).await.unwrap();
        assert_eq!(h.literature.call_count(), 0);
        assert!(response.articles.is_empty());
        assert_eq!(response.keywords, Some(vec![]));
    }

    #[tokio::test]
    async fn test_partial_literature_failure_still_answers() {
        let h = harness_with(
            MockProvider::new("answer"),
            MockLiteratureSource::new()
                .with_results("chest pain", vec![Article::new("1", "Chest pain triage")])
                .with_failure("shortness of breath"),
            AttestationConfig::default(),
        );
        let response = h
            .pipeline
            .run(QueryRequest::plaintext(
                "I have chest pain and shortness of breath",
                "s-1",
            ))
            .await
            .unwrap();

        assert_eq!(h.literature.call_count(), 2);
        assert_eq!(response.articles.len(), 1);
        assert_eq!(response.articles[0].url, "https://pubmed.ncbi.nlm.nih.gov/1/");
        assert_eq!(entries(&h, EventType::MedicalQuery).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_records_error_only() {
        let h = harness_with(
            MockProvider::new("unused").without_credential(),
            MockLiteratureSource::new(),
            AttestationConfig::default(),
        );
        let err = h
            .pipeline
            .run(QueryRequest::plaintext("chest pain", "s-1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Inference(InferenceError::MissingCredential)
        ));
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.literature.call_count(), 0);
        assert!(entries(&h, EventType::MedicalQuery).is_empty());
        assert_eq!(entries(&h, EventType::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_encrypted_round_trip_hides_keywords() {
        let h = harness();
        let sealed = h.cipher.seal("I have chest pain", "s-2").unwrap();
        let request = QueryRequest {
            encrypted_query: Some(sealed.ciphertext.clone()),
            encryption_metadata: Some(sealed.metadata),
            session_id: "s-2".to_string(),
            encryption_enabled: true,
            use_literature: true,
            ..QueryRequest::default()
        };

        let response = h.pipeline.run(request).await.unwrap();
        assert!(response.response.is_none());
        assert!(response.keywords.is_none());
        let opened = h
            .cipher
            .open(
                response.encrypted_response.as_deref().unwrap(),
                response.encryption_metadata.as_ref(),
                "s-2",
            )
            .unwrap();
        assert_eq!(opened, "Seek care if symptoms worsen.");

        let entry = &entries(&h, EventType::MedicalQuery)[0];
        assert_eq!(entry.detail_bool("encryption_enabled"), Some(true));
        let preview = entry.details["query_preview"].as_str().unwrap();
        assert!(sealed.ciphertext.starts_with(preview.trim_end_matches("...")));
    }

    #[tokio::test]
    async fn test_query_sealed_for_other_session_rejected() {
        let h = harness();
        let sealed = h.cipher.seal("I have chest pain", "s-owner").unwrap();
        let request = QueryRequest {
            encrypted_query: Some(sealed.ciphertext),
            session_id: "s-intruder".to_string(),
            encryption_enabled: true,
            ..QueryRequest::default()
        };

        let err = h.pipeline.run(request).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Decrypt(CryptoError::Authentication)
        ));
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(entries(&h, EventType::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_plaintext_with_encrypted_field_rejected() {
        let h = harness();
        let mut request = QueryRequest::plaintext("chest pain", "s-1");
        request.encrypted_document = Some("AAAA".to_string());

        let err = h.pipeline.run(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidQuery(_)));
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_query_rejected() {
        let h = harness();
        let request = QueryRequest::plaintext("a".repeat(4_001), "s-1");
        let err = h.pipeline.run(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_attestation_failure_is_not_fatal() {
        let h = harness_with(
            MockProvider::new("answer"),
            MockLiteratureSource::new(),
            AttestationConfig {
                remote_url: Some("http://127.0.0.1:1/attestation".to_string()),
                timeout_secs: 1,
                ..AttestationConfig::default()
            },
        );
        let mut request = QueryRequest::plaintext("headache", "s-1");
        request.request_attestation = true;

        let response = h.pipeline.run(request).await.unwrap();
        assert!(response.attestation_proof.is_none());
        let entry = &entries(&h, EventType::MedicalQuery)[0];
        assert_eq!(entry.detail_bool("attestation_included"), Some(false));
    }

    struct FailingAudit;

    impl AuditLog for FailingAudit {
        fn append(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
            Err(AuditError::Io(std::io::Error::other("disk full")))
        }

        fn entries(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
            Ok(Vec::new())
        }

        fn backend(&self) -> AuditBackend {
            AuditBackend::Memory
        }
    }

    #[tokio::test]
    async fn test_audit_failure_fails_query() {
        let provider = MockProvider::new("answer");
        let pipeline = QueryPipeline::new(
            Arc::new(provider.clone()),
            Arc::new(MockLiteratureSource::new()),
            Arc::new(KeywordExtractor::new().unwrap()),
            Arc::new(CipherContext::generate()),
            Arc::new(AttestationService::new(AttestationConfig::default()).unwrap()),
            Arc::new(FailingAudit),
            PipelineSettings::from_config(&ServerConfig::default_test_config()),
        );

        let err = pipeline
            .run(QueryRequest::plaintext("headache", "s-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Audit(_)));
        assert_eq!(provider.call_count(), 1);
    }
}
