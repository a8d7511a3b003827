use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::llm_client::{gemini, openrouter};
use crate::matching::prompts::PromptLanguage;

const DEFAULT_APP_NAME: &str = "ResumeMatch";
const DEFAULT_MAX_BODY_BYTES: usize = 2_000_000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Application configuration loaded from environment variables once at start-up.
/// A missing provider key is allowed here; match requests answer 500 until it is set.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub provider: ProviderConfig,
    pub language: PromptLanguage,
    pub http_timeout_secs: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(anyhow!(
                "MATCH_PROVIDER must be 'openrouter' or 'gemini', got '{other}'"
            )),
        }
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    /// Forwarded as `HTTP-Referer` to providers that support attribution.
    pub site_url: Option<String>,
    pub app_name: String,
    /// Overrides the provider's API origin.
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("site_url", &self.site_url)
            .field("app_name", &self.app_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let kind = get("MATCH_PROVIDER")
            .map(|v| v.parse::<ProviderKind>())
            .transpose()?
            .unwrap_or_default();

        let provider = match kind {
            ProviderKind::OpenRouter => ProviderConfig {
                kind,
                api_key: get(kind.api_key_var()),
                model: get("OPENROUTER_MODEL")
                    .unwrap_or_else(|| openrouter::DEFAULT_MODEL.to_string()),
                site_url: get("OPENROUTER_SITE_URL"),
                app_name: get("OPENROUTER_APP_NAME")
                    .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
                base_url: get("LLM_BASE_URL"),
            },
            ProviderKind::Gemini => ProviderConfig {
                kind,
                api_key: get(kind.api_key_var()),
                model: get("GEMINI_MODEL").unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
                site_url: None,
                app_name: String::new(),
                base_url: get("LLM_BASE_URL"),
            },
        };

        let language = get("MATCH_LANGUAGE")
            .map(|v| v.parse::<PromptLanguage>().map_err(|e| anyhow!("MATCH_LANGUAGE: {e}")))
            .transpose()?
            .unwrap_or_default();

        Ok(Config {
            port: parse_or(&get, "PORT", 8080_u16).context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            provider,
            language,
            http_timeout_secs: parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            max_body_bytes: parse_or(&get, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)
                .context("MAX_BODY_BYTES must be a byte count")?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for {key}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.provider.kind, ProviderKind::OpenRouter);
        assert_eq!(config.provider.api_key, None);
        assert_eq!(config.provider.model, openrouter::DEFAULT_MODEL);
        assert_eq!(config.provider.app_name, DEFAULT_APP_NAME);
        assert_eq!(config.language, PromptLanguage::Russian);
        assert_eq!(config.max_body_bytes, 2_000_000);
        assert_eq!(config.http_timeout_secs, 60);
    }

    #[test]
    fn test_openrouter_settings() {
        let config = config_from(&[
            ("OPENROUTER_API_KEY", "  sk-or  "),
            ("OPENROUTER_MODEL", "openai/gpt-4o-mini"),
            ("OPENROUTER_SITE_URL", "https://cv.example"),
            ("OPENROUTER_APP_NAME", "My CV"),
        ])
        .unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-or"));
        assert_eq!(config.provider.model, "openai/gpt-4o-mini");
        assert_eq!(config.provider.site_url.as_deref(), Some("https://cv.example"));
        assert_eq!(config.provider.app_name, "My CV");
    }

    #[test]
    fn test_gemini_selection_reads_its_own_key() {
        let config = config_from(&[
            ("MATCH_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "g-key"),
            ("OPENROUTER_API_KEY", "ignored"),
            ("MATCH_LANGUAGE", "en"),
        ])
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.provider.model, gemini::DEFAULT_MODEL);
        assert_eq!(config.language, PromptLanguage::English);
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = config_from(&[("OPENROUTER_API_KEY", "   ")]).unwrap();
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("MATCH_PROVIDER", "llama")]).is_err());
        assert!(config_from(&[("MATCH_LANGUAGE", "de")]).is_err());
        assert!(config_from(&[("MAX_BODY_BYTES", "-1")]).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-secret")]).unwrap();
        let printed = format!("{:?}", config.provider);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
