/// LLM Client — the single point of entry for all model calls in the service.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// Handlers depend on `MatchProvider`; the concrete provider is picked from config at start-up.
///
/// Every call is a single attempt. The match endpoint is user-facing and synchronous, so
/// failures surface immediately instead of being retried.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::{ProviderConfig, ProviderKind};
use crate::matching::prompts::PromptLanguage;
use crate::matching::result::MatchResult;

pub mod gemini;
pub mod openrouter;

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

/// Sampling temperature for match requests; low to keep scores stable.
pub const TEMPERATURE: f32 = 0.2;

/// How much of an upstream error body is echoed back in error messages.
const ERROR_BODY_CHARS: usize = 350;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} error {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Failed to parse model JSON: {0}")]
    Parse(String),

    #[error("Invalid provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl LlmError {
    /// Builds an `Api` error carrying a bounded prefix of the upstream body.
    pub(crate) fn api(provider: &'static str, status: u16, body: &str) -> Self {
        LlmError::Api {
            provider,
            status,
            message: crate::vacancy::normalize::truncate_chars(body, ERROR_BODY_CHARS).to_string(),
        }
    }
}

/// Scores a resume against a vacancy. Implement this per provider envelope.
///
/// Carried in `AppState` as `Arc<dyn MatchProvider>`.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    async fn request_match(
        &self,
        resume_text: &str,
        vacancy_text: &str,
    ) -> Result<MatchResult, LlmError>;

    /// Short backend label for logs and the health endpoint.
    fn name(&self) -> &'static str;
}

/// Builds the configured provider, or `None` when no API key is set.
pub fn build_provider(
    config: &ProviderConfig,
    language: PromptLanguage,
    client: Client,
) -> Option<Arc<dyn MatchProvider>> {
    let api_key = config.api_key.clone()?;

    let provider: Arc<dyn MatchProvider> = match config.kind {
        ProviderKind::OpenRouter => Arc::new(OpenRouterProvider::new(
            client,
            api_key,
            config.clone(),
            language,
        )),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            client,
            api_key,
            config.clone(),
            language,
        )),
    };
    Some(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(kind: ProviderKind, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: api_key.map(str::to_string),
            model: "test-model".to_string(),
            site_url: None,
            app_name: "ResumeMatch".to_string(),
            base_url: None,
        }
    }

    #[test]
    fn test_build_provider_requires_key() {
        let config = provider_config(ProviderKind::OpenRouter, None);
        assert!(build_provider(&config, PromptLanguage::Russian, Client::new()).is_none());
    }

    #[test]
    fn test_build_provider_selects_backend() {
        let openrouter = provider_config(ProviderKind::OpenRouter, Some("k"));
        let gemini = provider_config(ProviderKind::Gemini, Some("k"));

        let a = build_provider(&openrouter, PromptLanguage::Russian, Client::new()).unwrap();
        let b = build_provider(&gemini, PromptLanguage::Russian, Client::new()).unwrap();
        assert_eq!(a.name(), "openrouter");
        assert_eq!(b.name(), "gemini");
    }

    #[test]
    fn test_api_error_body_is_bounded() {
        let body = "x".repeat(1_000);
        let LlmError::Api { message, status, .. } = LlmError::api("openrouter", 500, &body) else {
            panic!("expected Api error");
        };
        assert_eq!(status, 500);
        assert_eq!(message.len(), ERROR_BODY_CHARS);
    }
}
