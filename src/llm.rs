use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{AppError, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// An external text-completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends `prompt` once and returns the raw completion text (possibly empty).
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenRouter,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-1.5-flash",
            LlmProvider::OpenRouter => "deepseek/deepseek-chat-v3-0324",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Gemini => f.write_str("gemini"),
            LlmProvider::OpenRouter => f.write_str("openrouter"),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(LlmProvider::Gemini),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            other => Err(AppError::ConfigError(format!("Unknown LLM provider: {}", other))),
        }
    }
}

/// Builds the configured generator authenticated with `api_key`.
pub fn build_generator(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn TextGenerator>> {
    let client = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build LLM client: {}", e)))?;

    let generator: Arc<dyn TextGenerator> = match config.provider {
        LlmProvider::Gemini => {
            let gemini = GeminiClient::new(client, api_key, &config.model);
            match &config.base_url {
                Some(base_url) => Arc::new(gemini.with_base_url(base_url.clone())),
                None => Arc::new(gemini),
            }
        }
        LlmProvider::OpenRouter => Arc::new(OpenRouterClient::new(client, api_key, &config.model)),
    };
    Ok(generator)
}

fn upstream_error(status: StatusCode, body: &serde_json::Value) -> AppError {
    let message = body["error"]["message"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| status.to_string());

    if status == StatusCode::SERVICE_UNAVAILABLE || message.to_lowercase().contains("overloaded") {
        AppError::UpstreamBusy(format!(
            "The model is overloaded right now ({}). Please try again in a moment.",
            message
        ))
    } else {
        AppError::LlmError(message)
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    AppError::LlmError(err.to_string())
}

/// Reads the body as JSON; error responses with a non-JSON body yield `Null`.
async fn read_json(res: reqwest::Response) -> Result<(StatusCode, serde_json::Value)> {
    let status = res.status();
    let text = res.text().await.map_err(transport_error)?;
    match serde_json::from_str(&text) {
        Ok(json) => Ok((status, json)),
        Err(_) if !status.is_success() => Ok((status, serde_json::Value::Null)),
        Err(e) => Err(AppError::LlmError(format!("Invalid response format from LLM: {}", e))),
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: &str, model: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

/// Joins the text parts of the first candidate.
fn gemini_text(body: &serde_json::Value) -> String {
    body["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        debug!(model = self.model.as_str(), "Calling Gemini generateContent");
        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let (status, json) = read_json(res).await?;
        if !status.is_success() {
            return Err(upstream_error(status, &json));
        }

        Ok(gemini_text(&json))
    }
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(client: Client, api_key: &str, model: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".into(),
                content: prompt.into(),
            }],
        };

        let request = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .header("X-Title", "The Daily Bugle")
            .json(&body);

        debug!(model = self.model.as_str(), "Calling OpenRouter chat completions");
        let res = request.send().await.map_err(transport_error)?;

        let (status, json) = read_json(res).await?;
        if !status.is_success() {
            return Err(upstream_error(status, &json));
        }

        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))?;

        Ok(choice["message"]["content"].as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<LlmProvider>().unwrap(), LlmProvider::Gemini);
        assert_eq!("openrouter".parse::<LlmProvider>().unwrap(), LlmProvider::OpenRouter);
        assert!("clippy".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_gemini_text_joins_parts() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "The council "}, {"text": "voted."}]}}]
        });
        assert_eq!(gemini_text(&body), "The council voted.");
        assert_eq!(gemini_text(&json!({"candidates": []})), "");
    }

    #[test]
    fn test_gemini_endpoint() {
        let client = GeminiClient::new(Client::new(), "key", "gemini-1.5-flash").with_base_url("http://localhost:9/v1/");
        assert_eq!(client.endpoint(), "http://localhost:9/v1/models/gemini-1.5-flash:generateContent");
    }

    #[test]
    fn test_upstream_error_classification() {
        let overloaded = json!({"error": {"message": "The model is overloaded."}});
        assert!(matches!(
            upstream_error(StatusCode::TOO_MANY_REQUESTS, &overloaded),
            AppError::UpstreamBusy(_)
        ));
        assert!(matches!(
            upstream_error(StatusCode::SERVICE_UNAVAILABLE, &json!({})),
            AppError::UpstreamBusy(_)
        ));

        let invalid = json!({"error": {"message": "API key not valid"}});
        match upstream_error(StatusCode::BAD_REQUEST, &invalid) {
            AppError::LlmError(msg) => assert_eq!(msg, "API key not valid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
