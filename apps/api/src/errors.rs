use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::vacancy::normalize::truncate_chars;
use crate::vacancy::VacancyError;

/// Upper bound on the `details` string; it can echo upstream content.
const MAX_DETAILS_CHARS: usize = 500;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    /// The vacancy locator could not be turned into text. Blamed on the third party,
    /// so the client is told how to work around it.
    #[error("{remediation}: {source}")]
    VacancyFetch {
        remediation: &'static str,
        #[source]
        source: VacancyError,
    },

    #[error("Server not configured: {0}")]
    Configuration(String),

    #[error("AI request failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Not found")]
    NotFound,

    #[error("Use {0}")]
    MethodNotAllowed(&'static str),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.to_string(), self.to_string())
            }
            AppError::InvalidJson(msg) => (
                StatusCode::BAD_REQUEST,
                "Invalid JSON".to_string(),
                msg.clone(),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::BAD_REQUEST,
                "Payload too large".to_string(),
                self.to_string(),
            ),
            AppError::VacancyFetch {
                remediation,
                source,
            } => {
                tracing::info!("Vacancy fetch failed: {source}");
                (StatusCode::BAD_REQUEST, remediation.to_string(), source.to_string())
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Server not configured: {msg}"),
                    msg.clone(),
                )
            }
            AppError::Provider(e) => {
                tracing::error!("LLM error: {e}");
                (StatusCode::BAD_GATEWAY, "AI request failed".to_string(), e.to_string())
            }
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, "Not found".to_string(), self.to_string())
            }
            AppError::MethodNotAllowed(_) => (
                StatusCode::METHOD_NOT_ALLOWED,
                self.to_string(),
                self.to_string(),
            ),
        };

        let body = Json(ErrorBody {
            error,
            details: truncate_chars(&details, MAX_DETAILS_CHARS).to_string(),
        });

        (status, body).into_response()
    }
}
