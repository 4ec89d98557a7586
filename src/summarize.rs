use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::extract::ExtractionChain;
use crate::llm::{build_generator, TextGenerator};

/// Pasted text shorter than this is rejected.
pub const MIN_TEXT_CHARS: usize = 100;
/// Pasted text is cut to this many characters before prompting.
pub const MAX_TEXT_CHARS: usize = 10_000;
pub const SUMMARY_WORDS: usize = 60;

const MISSING_KEY: &str = "API key not configured. Please set your API key first.";

/// What the prompt summarizes.
pub enum PromptSource<'a> {
    Article { title: Option<&'a str>, content: &'a str },
    Text(&'a str),
}

pub fn build_prompt(source: PromptSource<'_>) -> String {
    let (kind, body_len) = match &source {
        PromptSource::Article { content, .. } => ("article", content.len()),
        PromptSource::Text(text) => ("text", text.len()),
    };

    let mut result = String::with_capacity(body_len + 700);
    result.push_str(&format!(
        "You are an expert editor for a classic newspaper. Your task is to create a concise, \
         professional summary of the following {kind}.\n\n\
         Requirements:\n\
         - Write exactly {SUMMARY_WORDS} words\n\
         - Use clear, concise English in a classic newspaper editorial tone\n\
         - Focus on the most important facts and key points\n\
         - Write in third person\n\
         - Maintain journalistic objectivity\n\
         - No sensationalism or opinion\n\n"
    ));

    match source {
        PromptSource::Article { title, content } => {
            result.push_str("Article Title: ");
            result.push_str(title.unwrap_or("Unknown Title"));
            result.push_str("\n\nArticle Content:\n");
            result.push_str(content);
        }
        PromptSource::Text(text) => {
            result.push_str("Text Content:\n");
            result.push_str(text);
        }
    }

    result.push_str(&format!("\n\nProvide only the {SUMMARY_WORDS}-word summary, nothing else."));
    result
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub summary: String,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Words in the text that was summarized.
    pub source_words: usize,
}

/// Turns an article URL or pasted text into a short editorial summary.
pub struct Summarizer {
    chain: Arc<ExtractionChain>,
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(chain: Arc<ExtractionChain>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { chain, generator }
    }

    /// Builds a summarizer for the configured provider; no key is a validation error.
    pub fn with_api_key(chain: Arc<ExtractionChain>, llm: &LlmConfig, api_key: Option<&str>) -> Result<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::ValidationError(MISSING_KEY.to_string()))?;
        Ok(Self::new(chain, build_generator(llm, api_key)?))
    }

    pub async fn summarize_from_url(&self, url: &str) -> Result<Summary> {
        info!(url, "Starting summarization");
        let article = self.chain.extract(url).await.map_err(|e| match e {
            AppError::FetchError(msg) => AppError::FetchError(format!("Could not read the article. {}", msg)),
            other => other,
        })?;

        let prompt = build_prompt(PromptSource::Article {
            title: article.title.as_deref(),
            content: &article.content,
        });
        let summary = self.generate(&prompt).await?;

        Ok(Summary {
            summary,
            source_words: article.content.split_whitespace().count(),
            title: article.title,
            url: Some(article.source_url),
        })
    }

    pub async fn summarize_from_text(&self, text: &str) -> Result<Summary> {
        let text = text.trim();
        let length = text.chars().count();
        if length < MIN_TEXT_CHARS {
            return Err(AppError::ValidationError(format!(
                "Text is too short. Please provide at least {} characters.",
                MIN_TEXT_CHARS
            )));
        }

        let capped: String = text.chars().take(MAX_TEXT_CHARS).collect();
        if length > MAX_TEXT_CHARS {
            info!(chars = length, "Pasted text truncated to {} characters", MAX_TEXT_CHARS);
        }

        let summary = self.generate(&build_prompt(PromptSource::Text(&capped))).await?;
        Ok(Summary {
            summary,
            title: None,
            url: None,
            source_words: capped.split_whitespace().count(),
        })
    }

    /// One call, no retries.
    async fn generate(&self, prompt: &str) -> Result<String> {
        info!(prompt_chars = prompt.len(), "Calling LLM API");
        let started = Instant::now();

        let reply = self.generator.generate(prompt).await.map_err(|e| {
            warn!(error = %e, "LLM API call failed");
            match e {
                AppError::UpstreamBusy(msg) => AppError::UpstreamBusy(msg),
                other => AppError::LlmError(format!("generation failed: {}", other.user_message())),
            }
        })?;

        let summary = reply.trim();
        if summary.is_empty() {
            return Err(AppError::LlmError(
                "empty response: failed to generate summary, the model returned no text".to_string(),
            ));
        }

        info!(words = summary.split_whitespace().count(), "Summary generated in {:?}", started.elapsed());
        Ok(summary.to_string())
    }
}
