// Prompt text for the resume-to-vacancy match.
// Providers share these; only the envelope they are sent in differs.

use std::str::FromStr;

use crate::vacancy::normalize::truncate_chars;

/// Cap, in characters, on the combined resume + vacancy user message.
/// Applied after concatenation, so an oversized vacancy loses its tail, never the resume.
pub const MAX_PROMPT_CHARS: usize = 120_000;

/// Language the model is instructed to answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptLanguage {
    #[default]
    Russian,
    English,
}

impl FromStr for PromptLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" | "russian" => Ok(PromptLanguage::Russian),
            "en" | "english" => Ok(PromptLanguage::English),
            other => Err(format!("unsupported language '{other}' (expected 'ru' or 'en')")),
        }
    }
}

const SYSTEM_RU: &str = "\
Ты — помощник рекрутера.
Оцени, насколько кандидат подходит под вакансию.
Верни ответ СТРОГО в JSON без markdown, без лишних полей:
{ \"percent\": number, \"summary\": string }
percent: 0..100
summary: 2–4 коротких предложения на русском: сильные стороны + риски/пробелы
Если данных мало — снижай уверенность и процент.";

const SYSTEM_EN: &str = "\
You are a recruiter's assistant.
Assess how well the candidate fits the vacancy.
Reply STRICTLY with JSON, no markdown, no extra fields:
{ \"percent\": number, \"summary\": string }
percent: 0..100
summary: 2-4 short sentences in English: strengths plus risks/gaps
If the input is sparse, lower your confidence and the percent.";

impl PromptLanguage {
    pub fn system_prompt(self) -> &'static str {
        match self {
            PromptLanguage::Russian => SYSTEM_RU,
            PromptLanguage::English => SYSTEM_EN,
        }
    }

    fn labels(self) -> (&'static str, &'static str) {
        match self {
            PromptLanguage::Russian => ("РЕЗЮМЕ:", "ВАКАНСИЯ:"),
            PromptLanguage::English => ("RESUME:", "VACANCY:"),
        }
    }

    /// Shown to the user when a vacancy link cannot be read.
    pub fn fetch_remediation(self) -> &'static str {
        match self {
            PromptLanguage::Russian => {
                "Не удалось загрузить вакансию по ссылке. Вставьте текст вакансии вручную."
            }
            PromptLanguage::English => {
                "Could not load the vacancy from the link. Paste the vacancy text instead."
            }
        }
    }
}

/// Resume block first, vacancy block second, then the combined cap.
pub fn user_message(resume_text: &str, vacancy_text: &str, language: PromptLanguage) -> String {
    let (resume_label, vacancy_label) = language.labels();
    let message = format!("{resume_label}\n{resume_text}\n\n{vacancy_label}\n{vacancy_text}");
    truncate_chars(&message, MAX_PROMPT_CHARS).to_string()
}
