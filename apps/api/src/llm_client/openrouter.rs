//! OpenRouter chat-completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::llm_client::{LlmError, MatchProvider, TEMPERATURE};
use crate::matching::prompts::{user_message, PromptLanguage};
use crate::matching::result::MatchResult;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324";
const MAX_TOKENS: u32 = 400;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    /// Text of the first choice; empty when the envelope has none.
    fn text(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .unwrap_or_default()
    }
}

pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    config: ProviderConfig,
    language: PromptLanguage,
}

impl OpenRouterProvider {
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

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(OPENROUTER_API_URL)
            .trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl MatchProvider for OpenRouterProvider {
    async fn request_match(
        &self,
        resume_text: &str,
        vacancy_text: &str,
    ) -> Result<MatchResult, LlmError> {
        let user = user_message(resume_text, vacancy_text, self.language);
        let request_body = ChatRequest {
            model: &self.config.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.language.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        let mut request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request_body);
        if let Some(site_url) = &self.config.site_url {
            request = request.header("HTTP-Referer", site_url);
        }
        if !self.config.app_name.is_empty() {
            request = request.header("X-OpenRouter-Title", &self.config.app_name);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("OpenRouter returned {status}");
            return Err(LlmError::api("OpenRouter", status.as_u16(), &body));
        }

        let envelope: ChatResponse = serde_json::from_str(&body).unwrap_or_default();
        if let Some(usage) = &envelope.usage {
            debug!(
                "OpenRouter call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                self.config.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        MatchResult::from_reply(envelope.text())
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::test_support::{serve, test_client};
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    fn config(base_url: String) -> ProviderConfig {
        ProviderConfig {
            kind: ProviderKind::OpenRouter,
            api_key: Some("secret".to_string()),
            model: DEFAULT_MODEL.to_string(),
            site_url: Some("https://resume.example".to_string()),
            app_name: "ResumeMatch".to_string(),
            base_url: Some(base_url),
        }
    }

    fn provider(base_url: String) -> OpenRouterProvider {
        OpenRouterProvider::new(
            test_client(),
            "secret".to_string(),
            config(base_url),
            PromptLanguage::Russian,
        )
    }

    /// Echoes what it received inside the summary so tests can inspect the request.
    async fn echo_completion(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let seen = json!({
            "auth": headers.get("authorization").and_then(|v| v.to_str().ok()),
            "referer": headers.get("http-referer").and_then(|v| v.to_str().ok()),
            "title": headers.get("x-openrouter-title").and_then(|v| v.to_str().ok()),
            "model": body["model"],
            "temperature": body["temperature"],
            "max_tokens": body["max_tokens"],
            "roles": [body["messages"][0]["role"], body["messages"][1]["role"]],
        });
        let reply = json!({"percent": 77.4, "summary": seen.to_string()}).to_string();
        Json(json!({
            "choices": [{"message": {"role": "assistant", "content": reply}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }))
    }

    #[test]
    fn test_chat_response_text_tolerates_missing_parts() {
        let empty: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");

        let no_content: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {}}]}"#).unwrap();
        assert_eq!(no_content.text(), "");
    }

    #[tokio::test]
    async fn test_request_shape_and_result() {
        let base = serve(Router::new().route("/chat/completions", post(echo_completion))).await;

        let result = provider(base)
            .request_match("Rust developer", "Rust position")
            .await
            .unwrap();

        assert_eq!(result.percent(), 77);
        let seen: Value = serde_json::from_str(result.summary()).unwrap();
        assert_eq!(seen["auth"], "Bearer secret");
        assert_eq!(seen["referer"], "https://resume.example");
        assert_eq!(seen["title"], "ResumeMatch");
        assert_eq!(seen["model"], DEFAULT_MODEL);
        assert_eq!(seen["max_tokens"], 400);
        assert!((seen["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(seen["roles"], json!(["system", "user"]));
    }

    #[tokio::test]
    async fn test_prose_wrapped_reply_is_recovered() {
        let base = serve(Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(json!({"choices": [{"message": {"content":
                    "Here is the answer: {\"percent\": 80, \"summary\": \"Good fit\"} thanks"}}]}))
            }),
        ))
        .await;

        let result = provider(base).request_match("r", "v").await.unwrap();
        assert_eq!(result.percent(), 80);
        assert_eq!(result.summary(), "Good fit");
    }

    #[tokio::test]
    async fn test_error_status_is_provider_error() {
        let base = serve(Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "{\"error\":\"rate limited\"}") }),
        ))
        .await;

        let err = provider(base).request_match("r", "v").await.unwrap_err();
        match err {
            LlmError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_parse_error() {
        let base = serve(Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"content": "no json here"}}]})) }),
        ))
        .await;

        let err = provider(base).request_match("r", "v").await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }
}
