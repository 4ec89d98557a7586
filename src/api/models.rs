use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::summarize::Summary;

#[derive(Deserialize)]
pub struct SummarizeUrlRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct SummarizeTextRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub word_count: usize,
    pub summarized_at: DateTime<Utc>,
}

impl From<Summary> for SummarizeResponse {
    fn from(summary: Summary) -> Self {
        Self {
            word_count: summary.summary.split_whitespace().count(),
            summary: summary.summary,
            url: summary.url,
            title: summary.title,
            summarized_at: Utc::now(),
        }
    }
}

#[derive(Deserialize)]
pub struct ArchiveRequest {
    pub summary: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub id: String,
    pub removed: bool,
}

#[derive(Deserialize)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub has_api_key: bool,
    pub dark_mode: bool,
    pub provider: String,
    pub model: String,
    pub strategies: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub archive_entries: usize,
}
