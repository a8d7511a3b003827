//! Gemini generateContent backend. The API key travels in the query string.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::llm_client::{LlmError, MatchProvider, TEMPERATURE};
use crate::matching::prompts::{user_message, PromptLanguage};
use crate::matching::result::MatchResult;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const MAX_OUTPUT_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
}

impl GenerateResponse {
    /// All text parts of the first candidate, joined by newlines.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_deref().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    config: ProviderConfig,
    language: PromptLanguage,
}

impl GeminiProvider {
    pub fn new(
        client: Client,
        api_key: String,
        config: ProviderConfig,
        language: PromptLanguage,
    ) -> Self {
        Self {
            client,
            api_key,
            config,
            language,
        }
    }

    fn endpoint(&self) -> Result<Url, LlmError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_URL)
            .trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{base}/models/{}:generateContent",
            self.config.model
        ))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    /// Gemini gets one user turn: the instruction block followed by the labelled inputs.
    fn prompt(&self, resume_text: &str, vacancy_text: &str) -> String {
        format!(
            "{}\n\n{}",
            self.language.system_prompt(),
            user_message(resume_text, vacancy_text, self.language)
        )
    }
}

#[async_trait]
impl MatchProvider for GeminiProvider {
    async fn request_match(
        &self,
        resume_text: &str,
        vacancy_text: &str,
    ) -> Result<MatchResult, LlmError> {
        let prompt = self.prompt(resume_text, vacancy_text);
        let request_body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json",
            },
        };

        // the URL carries the key; transport errors drop it before they surface
        let response = self
            .client
            .post(self.endpoint()?)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.without_url()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.without_url()))?;

        if !status.is_success() {
            warn!("Gemini returned {status}");
            return Err(LlmError::api("Gemini", status.as_u16(), &body));
        }

        let envelope: GenerateResponse = serde_json::from_str(&body).unwrap_or_default();
        if let Some(usage) = &envelope.usage_metadata {
            debug!(
                "Gemini call succeeded: model={}, prompt_tokens={}, output_tokens={}",
                self.config.model, usage.prompt_token_count, usage.candidates_token_count
            );
        }

        MatchResult::from_reply(&envelope.text())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::errors::AppError;
    use crate::test_support::{serve, test_client};
    use axum::{
        body::to_bytes,
        extract::{Path, Query},
        response::IntoResponse,
        http::StatusCode,
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn provider(base_url: Option<String>) -> GeminiProvider {
        let config = ProviderConfig {
            kind: ProviderKind::Gemini,
            api_key: Some("k3y/with+chars".to_string()),
            model: DEFAULT_MODEL.to_string(),
            site_url: None,
            app_name: String::new(),
            base_url,
        };
        GeminiProvider::new(
            test_client(),
            "k3y/with+chars".to_string(),
            config,
            PromptLanguage::English,
        )
    }

    #[test]
    fn test_endpoint_embeds_encoded_key() {
        let url = provider(None).endpoint().unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=k3y%2Fwith%2Bchars"
        );
    }

    #[test]
    fn test_prompt_starts_with_instructions() {
        let prompt = provider(None).prompt("my resume", "the vacancy");
        assert!(prompt.starts_with(PromptLanguage::English.system_prompt()));
        assert!(prompt.ends_with("RESUME:\nmy resume\n\nVACANCY:\nthe vacancy"));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let envelope: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"percent\": 10,"}, {"text": "\"summary\": \"ok\"}"}]}}]
        }))
        .unwrap();
        assert_eq!(envelope.text(), "{\"percent\": 10,\n\"summary\": \"ok\"}");

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[tokio::test]
    async fn test_request_shape_and_result() {
        let router = Router::new().route(
            "/models/:model",
            post(
                |Path(model): Path<String>,
                 Query(query): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    let ok = model == "gemini-1.5-flash:generateContent"
                        && query.get("key").map(String::as_str) == Some("k3y/with+chars")
                        && body["generationConfig"]["responseMimeType"] == "application/json"
                        && body["generationConfig"]["maxOutputTokens"] == 500
                        && body["contents"][0]["role"] == "user";
                    let reply = if ok {
                        r#"{"percent": 150, "summary": "  Strong match  "}"#
                    } else {
                        r#"{"percent": 1, "summary": "unexpected request"}"#
                    };
                    Json(json!({"candidates": [{"content": {"parts": [{"text": reply}]}}]}))
                },
            ),
        );
        let base = serve(router).await;

        let result = provider(Some(base))
            .request_match("resume", "vacancy")
            .await
            .unwrap();
        assert_eq!(result.percent(), 100);
        assert_eq!(result.summary(), "Strong match");
    }

    #[tokio::test]
    async fn test_error_status_is_provider_error() {
        let router = Router::new().route(
            "/models/:model",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    "{\"error\":{\"message\":\"API key not valid\"}}",
                )
            }),
        );
        let base = serve(router).await;

        let err = provider(Some(base))
            .request_match("resume", "vacancy")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_key() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = provider(Some(closed))
            .request_match("resume", "vacancy")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
        assert!(!err.to_string().contains("k3y"));
        assert!(!format!("{err:?}").contains("k3y"));

        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("AI request failed"));
        assert!(!body.contains("k3y"));
    }
}
