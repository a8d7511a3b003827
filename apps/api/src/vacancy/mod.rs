// Vacancy ingestion: turns a vacancy locator into bounded plain text.
// Generic pages go through the normalizer; the one recognised job board is read from
// its structured-data script instead of its rendered HTML.

pub mod js_literal;
pub mod normalize;
pub mod record;
pub mod resolver;
pub mod site_data;

use thiserror::Error;
use url::Url;

/// Upper bound, in characters, on any vacancy text handed to the matcher.
pub const MAX_VACANCY_CHARS: usize = 60_000;

/// Sent on every outbound vacancy fetch.
pub const BOT_USER_AGENT: &str = "Mozilla/5.0 (compatible; ResumeMatchBot/1.0; +https://example.invalid)";

#[derive(Debug, Error)]
pub enum VacancyError {
    #[error("Invalid vacancy URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Missing id in vacancy URL")]
    MissingId,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{resource} fetch failed: {status}")]
    Status { resource: String, status: u16 },

    #[error("{0}")]
    Parse(String),

    #[error("Vacancy id not found: {0}")]
    NotFound(String),

    #[error("Structured data evaluation exceeded its time budget")]
    Timeout,
}

/// A job board whose detail pages are rendered client-side from a static data script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteProfile {
    pub host: &'static str,
    /// Path of the detail page; the record id travels in the `id` query parameter.
    pub page_path: &'static str,
    /// Script asset, resolved against the locator's origin.
    pub data_path: &'static str,
    /// Top-level binding holding the record array.
    pub binding: &'static str,
}

pub const ZAMESIN_JOBS: SiteProfile = SiteProfile {
    host: "zamesin.ru",
    page_path: "/jobs/vacancy.html",
    data_path: "/jobs/data/vacancies.js?v=3",
    binding: "vacancies",
};

impl SiteProfile {
    pub fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host) && url.path() == self.page_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_profile_matches_detail_page_only() {
        let detail = Url::parse("https://zamesin.ru/jobs/vacancy.html?id=12").unwrap();
        let listing = Url::parse("https://zamesin.ru/jobs/").unwrap();
        let other = Url::parse("https://example.com/jobs/vacancy.html?id=12").unwrap();

        assert!(ZAMESIN_JOBS.matches(&detail));
        assert!(!ZAMESIN_JOBS.matches(&listing));
        assert!(!ZAMESIN_JOBS.matches(&other));
    }

    #[test]
    fn test_data_path_resolves_against_origin() {
        let detail = Url::parse("https://zamesin.ru/jobs/vacancy.html?id=12").unwrap();
        let data = detail.join(ZAMESIN_JOBS.data_path).unwrap();
        assert_eq!(data.as_str(), "https://zamesin.ru/jobs/data/vacancies.js?v=3");
    }
}
