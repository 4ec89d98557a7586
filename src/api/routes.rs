use std::future::Future;
use std::time::Instant;

use axum::{
    routing::{delete, get, post, put},
    Router,
    extract::{Path, State},
    http::StatusCode,
};
use tower_http::cors::{CorsLayer, Any};
use tracing::{info, warn};

use crate::AppState;
use crate::api::json::ApiJson;
use crate::api::models::{
    ApiKeyRequest, ArchiveRequest, HealthResponse, RemovedResponse, SettingsResponse,
    SummarizeResponse, SummarizeTextRequest, SummarizeUrlRequest,
};
use crate::api::response::{self, ApiResult};
use crate::archive::ArchiveEntry;
use crate::error::{AppError, Result};
use crate::summarize::Summary;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/summarize/url", post(summarize_url_handler))
        .route("/api/summarize/text", post(summarize_text_handler))
        .route("/api/archive", get(list_archive_handler).post(add_archive_handler))
        .route("/api/archive/:id", delete(remove_archive_handler))
        .route("/api/settings", get(settings_handler))
        .route("/api/settings/api-key", put(set_api_key_handler).delete(clear_api_key_handler))
        .route("/api/settings/dark-mode/toggle", post(toggle_dark_mode_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn health_handler(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    response::respond(state.archive().map(|archive| HealthResponse {
        status: "ok".to_string(),
        archive_entries: archive.len(),
    }))
}

/// Runs one summarization under the in-flight gate and the overall request timeout.
async fn run_summarization<F, Fut>(state: &AppState, label: &str, job: F) -> ApiResult<SummarizeResponse>
where
    F: FnOnce(crate::summarize::Summarizer) -> Fut,
    Fut: Future<Output = Result<Summary>>,
{
    let start_time = Instant::now();

    let Ok(_guard) = state.in_flight.try_lock() else {
        warn!(request = label, "Rejected, another summarization is running");
        return response::from_error(&AppError::Busy);
    };

    let summarizer = match state.summarizer() {
        Ok(summarizer) => summarizer,
        Err(err) => return response::from_error(&err),
    };

    // Set an overall timeout for the entire request
    let result = tokio::time::timeout(state.config.request_timeout, job(summarizer)).await;
    let elapsed = start_time.elapsed();
    info!(request = label, "Request processing took {:?}", elapsed);

    match result {
        Ok(Ok(summary)) => response::success(SummarizeResponse::from(summary)),
        Ok(Err(err)) => {
            warn!(request = label, error = %err, "Summarization failed");
            response::from_error(&err)
        }
        Err(_) => {
            warn!(request = label, "Request timed out after {:?}", elapsed);
            response::error(
                StatusCode::REQUEST_TIMEOUT,
                "Request processing timed out. Try again, or paste the article text instead.".to_string(),
            )
        }
    }
}

async fn summarize_url_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SummarizeUrlRequest>,
) -> ApiResult<SummarizeResponse> {
    info!(url = req.url.as_str(), "Processing summarize request");
    run_summarization(&state, "url", |summarizer| async move {
        summarizer.summarize_from_url(&req.url).await
    })
    .await
}

async fn summarize_text_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SummarizeTextRequest>,
) -> ApiResult<SummarizeResponse> {
    info!(chars = req.text.len(), "Processing text summarize request");
    run_summarization(&state, "text", |summarizer| async move {
        summarizer.summarize_from_text(&req.text).await
    })
    .await
}

async fn list_archive_handler(State(state): State<AppState>) -> ApiResult<Vec<ArchiveEntry>> {
    response::respond(state.archive().map(|archive| archive.list().to_vec()))
}

async fn add_archive_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ArchiveRequest>,
) -> ApiResult<ArchiveEntry> {
    response::respond(
        state
            .archive()
            .and_then(|mut archive| archive.add(&req.summary, &req.url)),
    )
}

async fn remove_archive_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RemovedResponse> {
    response::respond(
        state
            .archive()
            .and_then(|mut archive| archive.remove(&id))
            .map(|removed| RemovedResponse { id, removed }),
    )
}

fn settings(state: &AppState) -> Result<SettingsResponse> {
    let preferences = state.preferences()?;
    Ok(SettingsResponse {
        has_api_key: preferences.has_api_key(),
        dark_mode: preferences.dark_mode,
        provider: state.config.llm.provider.to_string(),
        model: state.config.llm.model.clone(),
        strategies: state.chain.strategy_names().into_iter().map(String::from).collect(),
    })
}

async fn settings_handler(State(state): State<AppState>) -> ApiResult<SettingsResponse> {
    response::respond(settings(&state))
}

async fn set_api_key_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ApiKeyRequest>,
) -> ApiResult<SettingsResponse> {
    let result = state
        .update_preferences(|preferences| preferences.set_api_key(&req.api_key))
        .and_then(|_| settings(&state));
    response::respond(result)
}

async fn clear_api_key_handler(State(state): State<AppState>) -> ApiResult<SettingsResponse> {
    let result = state
        .update_preferences(|preferences| {
            preferences.clear_api_key();
            Ok(())
        })
        .and_then(|_| settings(&state));
    response::respond(result)
}

async fn toggle_dark_mode_handler(State(state): State<AppState>) -> ApiResult<SettingsResponse> {
    let result = state
        .update_preferences(|preferences| Ok(preferences.toggle_dark_mode()))
        .and_then(|_| settings(&state));
    response::respond(result)
}
