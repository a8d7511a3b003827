//! Structured-data extractor for the recognised job board.
//!
//! Fetches the board's data script, decodes the record array under a strict time budget,
//! picks the record whose id matches the locator and renders it as labelled text.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::vacancy::js_literal::{read_binding, LiteralError};
use crate::vacancy::record::VacancyRecord;
use crate::vacancy::{SiteProfile, VacancyError, BOT_USER_AGENT};

/// Wall-clock budget for decoding the data script.
pub const EVALUATION_BUDGET: Duration = Duration::from_secs(1);

/// Resolves a detail-page locator of `site` into vacancy text.
pub async fn extract_by_site_id(
    client: &Client,
    locator: &Url,
    site: &SiteProfile,
) -> Result<String, VacancyError> {
    let id = locator
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default();
    if id.is_empty() {
        return Err(VacancyError::MissingId);
    }

    let data_url = locator.join(site.data_path)?;
    info!("Fetching structured vacancy data from {data_url} (id={id})");

    let response = client
        .get(data_url)
        .header(USER_AGENT, BOT_USER_AGENT)
        .header(ACCEPT, "*/*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        warn!("Structured data fetch returned {status}");
        return Err(VacancyError::Status {
            resource: format!("{} data script", site.host),
            status: status.as_u16(),
        });
    }

    let source = response.text().await?;
    let records = evaluate_records(source, site.binding, EVALUATION_BUDGET).await?;
    debug!("Decoded {} records from {}", records.len(), site.host);

    let raw = find_record(&records, &id)?;
    let record: VacancyRecord = serde_json::from_value(raw.clone())
        .map_err(|e| VacancyError::Parse(format!("Malformed vacancy record {id}: {e}")))?;

    Ok(record.to_plain_text(site.host, raw))
}

/// Decodes the `binding` array out of `source` on a blocking worker.
///
/// The budget is enforced twice: the reader checks a deadline as it goes, and the
/// caller stops waiting once the same budget has elapsed.
pub async fn evaluate_records(
    source: String,
    binding: &str,
    budget: Duration,
) -> Result<Vec<Value>, VacancyError> {
    let binding = binding.to_string();
    let deadline = Instant::now() + budget;
    let task = tokio::task::spawn_blocking(move || read_binding(&source, &binding, deadline));

    let value = match tokio::time::timeout(budget, task).await {
        Err(_) | Ok(Ok(Err(LiteralError::Deadline))) => return Err(VacancyError::Timeout),
        Ok(Err(join_error)) => {
            return Err(VacancyError::Parse(format!(
                "Structured data evaluation failed: {join_error}"
            )))
        }
        Ok(Ok(Err(e))) => {
            return Err(VacancyError::Parse(format!(
                "Structured data parse failed: {e}"
            )))
        }
        Ok(Ok(Ok(value))) => value,
    };

    match value {
        Value::Array(records) => Ok(records),
        _ => Err(VacancyError::Parse(
            "Structured data parse failed: binding is not an array".to_string(),
        )),
    }
}

/// First object whose `id`, stringified, equals `id`.
pub fn find_record<'a>(records: &'a [Value], id: &str) -> Result<&'a Value, VacancyError> {
    records
        .iter()
        .filter(|record| record.is_object())
        .find(|record| id_as_string(record.get("id")) == id)
        .ok_or_else(|| VacancyError::NotFound(id.to_string()))
}

fn id_as_string(id: Option<&Value>) -> String {
    match id {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
