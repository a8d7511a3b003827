//! Typed view of a record from the structured-data source, plus its plain-text rendering.
//!
//! Records are loosely typed upstream: every field is optional, scalars may be strings or
//! numbers, and lists may contain junk. Coercion happens here, at the deserialisation
//! boundary, so rendering works on one canonical shape.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::vacancy::normalize::{normalize, truncate_chars};
use crate::vacancy::MAX_VACANCY_CHARS;

const DEFAULT_SECTION_TITLE: &str = "Раздел";

/// One vacancy as published by the structured-data source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VacancyRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub subtitle: Option<String>,
    /// Short description shown on the listing card.
    #[serde(deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub intro: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub card_details: Vec<String>,
    #[serde(deserialize_with = "lenient_sections")]
    pub sections: Vec<Section>,
    /// `None` entries keep their slot so step numbering matches the source.
    #[serde(deserialize_with = "lenient_steps")]
    pub hiring_process: Vec<Option<HiringStep>>,
    #[serde(deserialize_with = "lenient_text")]
    pub contact_url: Option<String>,
}

/// A named block of the vacancy page.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub content: Vec<SectionContent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionContent {
    FreeText(String),
    BulletList(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HiringStep {
    PlainText(String),
    Detailed {
        title: Option<String>,
        text: Option<String>,
    },
}

/// Wire shape of a section; `name` and `points` are aliases seen in the source data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSection {
    #[serde(deserialize_with = "lenient_text")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    text: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    items: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    points: Vec<String>,
}

impl From<RawSection> for Section {
    fn from(raw: RawSection) -> Self {
        let mut content = Vec::new();
        if let Some(text) = raw.text {
            content.push(SectionContent::FreeText(text));
        }
        let bullets: Vec<String> = raw.items.into_iter().chain(raw.points).collect();
        if !bullets.is_empty() {
            content.push(SectionContent::BulletList(bullets));
        }

        Section {
            title: raw
                .title
                .or(raw.name)
                .unwrap_or_else(|| DEFAULT_SECTION_TITLE.to_string()),
            content,
        }
    }
}

impl HiringStep {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(HiringStep::PlainText(s.clone())),
            Value::Object(map) => Some(HiringStep::Detailed {
                title: map
                    .get("title")
                    .and_then(coerce_text)
                    .or_else(|| map.get("name").and_then(coerce_text)),
                text: map
                    .get("text")
                    .and_then(coerce_text)
                    .or_else(|| map.get("description").and_then(coerce_text)),
            }),
            other => Some(HiringStep::PlainText(
                coerce_text(other).unwrap_or_default(),
            )),
        }
    }

    /// Renders the step body without its number; `None` when nothing is left to show.
    fn render(&self) -> Option<String> {
        match self {
            HiringStep::PlainText(text) => Some(normalize(text)),
            HiringStep::Detailed { title, text } => {
                let title = title.as_deref().map(normalize).unwrap_or_default();
                let text = text.as_deref().map(normalize).unwrap_or_default();
                match (title.is_empty(), text.is_empty()) {
                    (false, false) => Some(format!("{title} — {text}")),
                    (false, true) => Some(title),
                    (true, false) => Some(text),
                    (true, true) => None,
                }
            }
        }
    }
}

impl VacancyRecord {
    /// Serialises the record into a labelled plain-text document.
    ///
    /// `raw` is the record exactly as decoded from the source; it is appended as JSON at the
    /// end so fields without a dedicated label still reach the model. The whole document is
    /// truncated last, so that dump is the first thing to go on oversized records.
    pub fn to_plain_text(&self, source: &str, raw: &Value) -> String {
        let mut parts: Vec<String> = vec![format!("ИСТОЧНИК: {source}")];

        push_field(&mut parts, "ID", &self.id);
        push_field(&mut parts, "ВАКАНСИЯ", &self.title);
        push_field(&mut parts, "Подзаголовок", &self.subtitle);
        push_field(&mut parts, "Коротко", &self.description);
        push_field(&mut parts, "Введение", &self.intro);
        push_joined(&mut parts, "Категории", &self.categories);
        push_joined(&mut parts, "Теги", &self.tags);

        if !self.card_details.is_empty() {
            parts.push(String::new());
            parts.push("Детали:".to_string());
            push_bullets(&mut parts, &self.card_details);
        }

        if !self.sections.is_empty() {
            parts.push(String::new());
            parts.push("Секции:".to_string());
            for section in &self.sections {
                parts.push(String::new());
                parts.push(normalize(&section.title));
                for block in &section.content {
                    match block {
                        SectionContent::FreeText(text) => parts.push(normalize(text)),
                        SectionContent::BulletList(items) => push_bullets(&mut parts, items),
                    }
                }
            }
        }

        if !self.hiring_process.is_empty() {
            parts.push(String::new());
            parts.push("Процесс найма:".to_string());
            for (index, step) in self.hiring_process.iter().enumerate() {
                if let Some(line) = step.as_ref().and_then(HiringStep::render) {
                    parts.push(format!("{}. {line}", index + 1));
                }
            }
        }

        if let Some(contact) = &self.contact_url {
            parts.push(String::new());
            parts.push(format!("Ссылка для отклика/контакта: {}", contact.trim()));
        }

        match serde_json::to_string(raw) {
            Ok(dump) => {
                parts.push(String::new());
                parts.push("RAW_JSON:".to_string());
                parts.push(dump);
            }
            Err(e) => tracing::debug!("Skipping raw vacancy dump: {e}"),
        }

        truncate_chars(parts.join("\n").trim(), MAX_VACANCY_CHARS).to_string()
    }
}

fn push_field(parts: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value {
        parts.push(format!("{label}: {}", normalize(value)));
    }
}

fn push_joined(parts: &mut Vec<String>, label: &str, values: &[String]) {
    let joined: Vec<String> = values
        .iter()
        .map(|v| normalize(v))
        .filter(|v| !v.is_empty())
        .collect();
    if !joined.is_empty() {
        parts.push(format!("{label}: {}", joined.join(", ")));
    }
}

fn push_bullets(parts: &mut Vec<String>, items: &[String]) {
    for item in items {
        parts.push(format!("- {}", normalize(item)));
    }
}

/// Scalar coercion used for every text field. Empty strings, `null` and `false` count as absent.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        composite => serde_json::to_string(composite).ok(),
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_text(&value))
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(coerce_text).collect(),
        _ => Vec::new(),
    })
}

fn lenient_sections<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Section>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter(|item| !matches!(item, Value::Null | Value::Bool(false)))
        .map(|item| {
            serde_json::from_value::<RawSection>(item)
                .unwrap_or_default()
                .into()
        })
        .collect())
}

fn lenient_steps<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Option<HiringStep>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().map(HiringStep::from_value).collect(),
        _ => Vec::new(),
    })
}
