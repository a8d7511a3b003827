//! Axum route handler for the match endpoint.
//!
//! Flow: validate input → check provider → resolve vacancy → request match → respond.
//! Each step either hands over to the next or ends the request with an `AppError`.

use axum::{
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::matching::result::MatchResult;
use crate::state::AppState;
use crate::vacancy::normalize::truncate_chars;

/// Resume text beyond this many characters is dropped before matching.
pub const MAX_RESUME_CHARS: usize = 25_000;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

/// Inbound body of `POST /match`. Non-string values are treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchRequest {
    #[serde(deserialize_with = "string_or_none")]
    pub vacancy_url: Option<String>,
    #[serde(deserialize_with = "string_or_none")]
    pub vacancy_text: Option<String>,
    #[serde(deserialize_with = "string_or_none")]
    pub resume_text: Option<String>,
}

/// Where the vacancy text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VacancyLocator {
    /// Pasted by the user; only trimmed. The combined prompt cap is its sole bound.
    Text(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMatch {
    pub resume_text: String,
    pub vacancy: VacancyLocator,
}

impl MatchRequest {
    /// Reads the fields of a JSON object. Any other JSON value carries no fields.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Trims and bounds the inputs. Inline vacancy text wins over a URL.
    pub fn validate(self) -> Result<ValidatedMatch, AppError> {
        let resume_text = non_blank(self.resume_text)
            .map(|text| truncate_chars(&text, MAX_RESUME_CHARS).to_string())
            .ok_or(AppError::Validation("resumeText required"))?;

        let vacancy = match (non_blank(self.vacancy_text), non_blank(self.vacancy_url)) {
            (Some(text), _) => VacancyLocator::Text(text),
            (None, Some(url)) => VacancyLocator::Url(url),
            (None, None) => {
                return Err(AppError::Validation("vacancyUrl or vacancyText required"))
            }
        };

        Ok(ValidatedMatch {
            resume_text,
            vacancy,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /match (also mounted at /api/match)
///
/// Scores the resume against the vacancy and returns `{ percent, summary }`.
pub async fn handle_match(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<MatchResult>, AppError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::InvalidJson(rejection.body_text())
        }
    })?;

    let value: Value =
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidJson(e.to_string()))?;
    let input = MatchRequest::from_json(value)
        .validate()
        .inspect_err(|e| debug!("Rejected match request: {e}"))?;

    let matcher = state.matcher.as_ref().ok_or_else(|| {
        AppError::Configuration(format!(
            "Missing {}",
            state.config.provider.kind.api_key_var()
        ))
    })?;

    let vacancy_text = match input.vacancy {
        VacancyLocator::Text(text) => text,
        VacancyLocator::Url(url) => {
            let text = state
                .resolver
                .resolve(&url)
                .await
                .map_err(|source| AppError::VacancyFetch {
                    remediation: state.config.language.fetch_remediation(),
                    source,
                })?;
            info!("Resolved vacancy {url} ({} chars)", text.chars().count());
            text
        }
    };

    let result = matcher
        .request_match(&input.resume_text, &vacancy_text)
        .await?;
    info!(
        "Match computed by {}: percent={}",
        matcher.name(),
        result.percent()
    );

    Ok(Json(result))
}
