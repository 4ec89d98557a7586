use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected before any network call; the caller can fix the input.
    #[error("{0}")]
    ValidationError(String),

    #[error("Failed to fetch data: {0}")]
    FetchError(String),

    #[error("Error extracting content: {0}")]
    ContentError(String),

    #[error("LLM processing error: {0}")]
    LlmError(String),

    #[error("LLM service busy: {0}")]
    UpstreamBusy(String),

    #[error("A summarization is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::FetchError(_) => StatusCode::BAD_GATEWAY,
            AppError::ContentError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::LlmError(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to a user, without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::FetchError(msg)
            | AppError::ContentError(msg)
            | AppError::LlmError(msg)
            | AppError::UpstreamBusy(msg)
            | AppError::ConfigError(msg)
            | AppError::StorageError(msg) => msg.clone(),
            AppError::Busy => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        response::from_error::<()>(&self).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::FetchError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::ValidationError(format!("Invalid URL format ({}). Please check the URL and try again.", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::ValidationError("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Busy.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::UpstreamBusy("x".into()).status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_url_parse_error_is_validation() {
        let err: AppError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(err.user_message().starts_with("Invalid URL"));
    }

    #[test]
    fn test_into_response_keeps_status() {
        let response = AppError::Busy.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_missing_env_var_is_config_error() {
        let err: AppError = std::env::var("DAILY_BUGLE_UNSET_VARIABLE").unwrap_err().into();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
