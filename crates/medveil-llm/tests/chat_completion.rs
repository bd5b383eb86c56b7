//! ChatCompletionProvider against an in-process OpenAI-compatible server

use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use medveil_domain::ChatMessage;
use medveil_llm::{ChatCompletionProvider, InferenceConfig, InferenceError, InferenceProvider};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn config(base_url: String, api_key: Option<&str>) -> InferenceConfig {
    InferenceConfig {
        base_url,
        api_key: api_key.map(str::to_string),
        ..InferenceConfig::default()
    }
}

#[tokio::test]
async fn test_completion_sends_bearer_and_parses_choice() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            let auth = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if auth != "Bearer nk-test" {
                return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad token"})));
            }
            let last = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
            (
                StatusCode::OK,
                Json(json!({
                    "model": "google/gemma-3-27b-it",
                    "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", last)}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
                })),
            )
        }),
    );
    let base = spawn(app).await;
    let provider = ChatCompletionProvider::new(config(base, Some("nk-test"))).unwrap();

    provider.ensure_ready().unwrap();
    let completion = provider
        .complete(&[ChatMessage::system("sys"), ChatMessage::user("fever")])
        .await
        .unwrap();

    assert_eq!(completion.text, "echo: fever");
    assert_eq!(completion.model, "google/gemma-3-27b-it");
    assert_eq!(completion.usage.unwrap().total_tokens, 16);
}

#[tokio::test]
async fn test_upstream_status_and_body_are_preserved_without_retry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::SERVICE_UNAVAILABLE, "model loading")
            }
        }),
    );
    let base = spawn(app).await;
    let provider = ChatCompletionProvider::new(config(base, Some("nk-test"))).unwrap();

    match provider.complete(&[ChatMessage::user("x")]).await {
        Err(InferenceError::Upstream { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "model loading");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            }
        }),
    );
    let base = spawn(app).await;
    let provider = ChatCompletionProvider::new(config(base, None)).unwrap();

    assert!(matches!(
        provider.ensure_ready(),
        Err(InferenceError::MissingCredential)
    ));
    assert!(matches!(
        provider.complete(&[ChatMessage::user("x")]).await,
        Err(InferenceError::MissingCredential)
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_choices_is_invalid_response() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let base = spawn(app).await;
    let provider = ChatCompletionProvider::new(config(base, Some("nk-test"))).unwrap();

    assert!(matches!(
        provider.complete(&[ChatMessage::user("x")]).await,
        Err(InferenceError::InvalidResponse(_))
    ));
}
