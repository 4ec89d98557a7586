use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

use daily_bugle::api::routes::create_router;
use daily_bugle::config::Config;
use daily_bugle::error::Result;
use daily_bugle::extract::{ExtractionChain, ExtractionRules, FetchStrategy, HtmlParser};
use daily_bugle::llm::TextGenerator;
use daily_bugle::storage::{KeyValueStore, MemoryStore, DARK_MODE};
use daily_bugle::AppState;

const SUMMARY: &str = "The city council approved the harbour redevelopment plan on Tuesday evening.";

struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("  {}  ", SUMMARY))
    }
}

struct ArticlePage;

#[async_trait]
impl FetchStrategy for ArticlePage {
    fn name(&self) -> &str {
        "article-page"
    }

    async fn fetch(&self, _url: &Url) -> Result<String> {
        Ok(format!(
            "<html><body><h1>Harbour Plan Wins Council Vote</h1><article>{}</article></body></html>",
            "The council approved the harbour plan after a long debate. ".repeat(12)
        ))
    }
}

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "DATA_DIR" => Some("/tmp/daily-bugle-tests".to_string()),
        _ => None,
    })
    .unwrap()
}

fn state(store: Arc<dyn KeyValueStore>) -> AppState {
    let parser = Arc::new(HtmlParser::new(ExtractionRules::default()).unwrap());
    let chain = ExtractionChain::new(parser, Duration::from_secs(1)).with_strategy(ArticlePage);
    AppState::with_parts(config(), store, chain).unwrap()
}

fn with_generator(store: Arc<dyn KeyValueStore>) -> (AppState, Arc<CountingGenerator>) {
    let generator = Arc::new(CountingGenerator {
        calls: AtomicUsize::new(0),
    });
    (state(store).with_generator(generator.clone()), generator)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = create_router(state(Arc::new(MemoryStore::new())));
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["meta"]["status"], "success");
}

#[tokio::test]
async fn test_summarize_url() {
    let (state, generator) = with_generator(Arc::new(MemoryStore::new()));
    let app = create_router(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/summarize/url",
        Some(json!({"url": "https://news.example.com/harbour"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"], SUMMARY);
    assert_eq!(body["data"]["title"], "Harbour Plan Wins Council Vote");
    assert_eq!(body["data"]["url"], "https://news.example.com/harbour");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_url_is_rejected_without_calls() {
    let (state, generator) = with_generator(Arc::new(MemoryStore::new()));
    let app = create_router(state);

    let (status, body) = send(&app, "POST", "/api/summarize/url", Some(json!({"url": "yesterday's paper"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["meta"]["status"], "error");
    assert!(body["data"].is_null());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let (state, generator) = with_generator(Arc::new(MemoryStore::new()));
    let app = create_router(state);

    let (status, body) = send(&app, "POST", "/api/summarize/url", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["meta"]["status"], "error");
    assert!(body["meta"]["message"].as_str().unwrap().contains("url"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/summarize/url")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["meta"]["status"], "error");
    assert!(body["data"].is_null());

    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_summarize_text() {
    let (state, generator) = with_generator(Arc::new(MemoryStore::new()));
    let app = create_router(state);

    let (status, _) = send(&app, "POST", "/api/summarize/text", Some(json!({"text": "Too short."}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let text = "Residents packed the town hall to hear the final arguments. ".repeat(4);
    let (status, body) = send(&app, "POST", "/api/summarize/text", Some(json!({"text": text}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"], SUMMARY);
    assert!(body["data"]["url"].is_null());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_api_key() {
    let app = create_router(state(Arc::new(MemoryStore::new())));
    let text = "Residents packed the town hall to hear the final arguments. ".repeat(4);

    let (status, body) = send(&app, "POST", "/api/summarize/text", Some(json!({"text": text}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["meta"]["message"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn test_second_summarization_is_rejected_while_busy() {
    let (state, generator) = with_generator(Arc::new(MemoryStore::new()));
    let app = create_router(state.clone());
    let _running = state.in_flight.lock().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/summarize/url",
        Some(json!({"url": "https://news.example.com/harbour"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_archive_lifecycle() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let app = create_router(state(store.clone()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/archive",
        Some(json!({"summary": SUMMARY, "url": "https://news.example.com/harbour"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, "GET", "/api/archive", None).await;
    assert_eq!(body["data"][0]["id"], id.as_str());
    assert_eq!(body["data"][0]["summary"], SUMMARY);
    assert_eq!(body["data"][0]["url"], "https://news.example.com/harbour");

    // A fresh state over the same store sees the saved entry
    let reopened = create_router(state(store.clone()));
    let (_, body) = send(&reopened, "GET", "/api/archive", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "DELETE", &format!("/api/archive/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], true);

    let (_, body) = send(&app, "GET", "/api/archive", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_settings() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let app = create_router(state(store.clone()));

    let (_, body) = send(&app, "GET", "/api/settings", None).await;
    assert_eq!(body["data"]["has_api_key"], false);
    assert_eq!(body["data"]["dark_mode"], false);
    assert_eq!(body["data"]["strategies"], json!(["article-page"]));

    let (status, _) = send(&app, "PUT", "/api/settings/api-key", Some(json!({"api_key": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "PUT", "/api/settings/api-key", Some(json!({"api_key": "AIza-test"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_api_key"], true);

    let (_, body) = send(&app, "POST", "/api/settings/dark-mode/toggle", None).await;
    assert_eq!(body["data"]["dark_mode"], true);
    assert_eq!(store.get(DARK_MODE).unwrap().as_deref(), Some("true"));

    let (_, body) = send(&app, "DELETE", "/api/settings/api-key", None).await;
    assert_eq!(body["data"]["has_api_key"], false);
}
