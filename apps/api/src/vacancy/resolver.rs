//! Vacancy resolver — dispatches a locator URL to the structured-data extractor or to a
//! generic page fetch.

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use crate::vacancy::normalize::{normalize, truncate_chars};
use crate::vacancy::site_data::extract_by_site_id;
use crate::vacancy::{SiteProfile, VacancyError, BOT_USER_AGENT, MAX_VACANCY_CHARS, ZAMESIN_JOBS};

#[derive(Clone)]
pub struct VacancyResolver {
    client: Client,
    site: SiteProfile,
}

impl VacancyResolver {
    /// `client` should follow redirects; the one built in `main` does.
    pub fn new(client: Client) -> Self {
        Self::with_site(client, ZAMESIN_JOBS)
    }

    pub fn with_site(client: Client, site: SiteProfile) -> Self {
        Self { client, site }
    }

    /// Produces bounded plain text for the vacancy behind `locator`.
    pub async fn resolve(&self, locator: &str) -> Result<String, VacancyError> {
        let url = Url::parse(locator.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VacancyError::UnsupportedScheme(url.scheme().to_string()));
        }

        if self.site.matches(&url) {
            info!("Resolving {url} through {} structured data", self.site.host);
            return extract_by_site_id(&self.client, &url, &self.site).await;
        }

        self.fetch_page(&url).await
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, VacancyError> {
        info!("Fetching vacancy page {url}");

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BOT_USER_AGENT)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Vacancy page {url} returned {status}");
            return Err(VacancyError::Status {
                resource: "Vacancy".to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        Ok(page_to_text(&content_type, &body))
    }
}

/// HTML bodies are normalized; anything else is taken as plain text verbatim.
pub fn page_to_text(content_type: &str, body: &str) -> String {
    if content_type.contains("text/html") {
        truncate_chars(&normalize(body), MAX_VACANCY_CHARS).to_string()
    } else {
        truncate_chars(body, MAX_VACANCY_CHARS).to_string()
    }
}
