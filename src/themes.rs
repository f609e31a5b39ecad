//! Theme analysis: ask the LLM to cluster suggestions into topical themes.

use crate::consolidate::dedup_texts;
use crate::llm::{generate_or_none, TextGenerator};
use crate::retry::RetryPolicy;
use crate::suggest::SuggestionRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A topical cluster identified by the LLM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDescriptor {
    pub name: String,
    pub concepts: Vec<String>,
    /// Dominant search intent (informational, transactional, ...)
    pub intent: String,
    /// 1 (minor) to 5 (central)
    pub importance: u8,
    /// Suggestions that belong to this theme
    pub examples: Vec<String>,
}

impl Default for ThemeDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            concepts: Vec::new(),
            intent: String::new(),
            importance: DEFAULT_IMPORTANCE,
            examples: Vec::new(),
        }
    }
}

const DEFAULT_IMPORTANCE: u8 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Theme analysis answer is not valid JSON: {0}")]
    Malformed(String),
}

/// Shape the LLM is asked for; every field is optional on the way in
#[derive(Debug, Deserialize)]
struct RawThemes {
    #[serde(default)]
    themes: Vec<RawTheme>,
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    #[serde(default, alias = "nom", alias = "theme")]
    name: String,
    #[serde(default, alias = "key_concepts")]
    concepts: Vec<String>,
    #[serde(default, alias = "dominant_intent", alias = "intention")]
    intent: String,
    #[serde(default)]
    importance: serde_json::Value,
    #[serde(default, alias = "example_suggestions", alias = "suggestions")]
    examples: Vec<String>,
}

/// Read an importance score leniently (number, float or numeric string)
/// and clamp it into 1..=5
fn importance_from(value: &serde_json::Value) -> u8 {
    let raw = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    };
    raw.map(|v| v.clamp(1, 5) as u8).unwrap_or(DEFAULT_IMPORTANCE)
}

/// Slice from the first `open` to the last `close`, which drops Markdown
/// code fences and any prose around the JSON payload
pub(crate) fn json_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

pub fn build_theme_prompt(
    seeds: &[String],
    suggestions: &[String],
    language: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Analyse these search suggestions collected for the keywords: {}.\n",
        seeds.join(", ")
    ));
    prompt.push_str("Group them into coherent themes that reflect distinct search needs.\n\n");
    prompt.push_str("Suggestions:\n");
    for suggestion in suggestions {
        prompt.push_str(&format!("- {}\n", suggestion));
    }
    prompt.push_str(&format!(
        "\nAnswer in the language with code '{language}'. Reply with JSON only, using this shape:\n\
         {{\"themes\": [{{\"name\": \"...\", \"concepts\": [\"...\"], \"intent\": \"informational|commercial|transactional|navigational\", \
         \"importance\": 1-5, \"examples\": [\"suggestion taken from the list\"]}}]}}\n\
         Importance 5 means the theme is central to the keywords."
    ));
    prompt
}

/// Parse the LLM's theme answer. Unnamed themes are dropped; the rest are
/// ordered by importance, most important first.
pub fn parse_themes(response: &str) -> Result<Vec<ThemeDescriptor>, ThemeError> {
    let payload = json_slice(response, '{', '}')
        .ok_or_else(|| ThemeError::Malformed("no JSON object found".to_string()))?;
    let raw: RawThemes =
        serde_json::from_str(payload).map_err(|e| ThemeError::Malformed(e.to_string()))?;

    let mut themes: Vec<ThemeDescriptor> = raw
        .themes
        .into_iter()
        .filter(|t| !t.name.trim().is_empty())
        .map(|t| ThemeDescriptor {
            importance: importance_from(&t.importance),
            name: t.name.trim().to_string(),
            concepts: t.concepts,
            intent: t.intent.trim().to_string(),
            examples: t.examples,
        })
        .collect();

    themes.sort_by(|a, b| b.importance.cmp(&a.importance));
    Ok(themes)
}

/// Runs the theme-analysis prompt against an injected generator
pub struct ThemeAnalyzer {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    max_suggestions: usize,
}

impl ThemeAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy) -> Self {
        Self {
            generator,
            retry,
            max_suggestions: 200,
        }
    }

    /// Cap on the number of suggestions quoted in the prompt
    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions.max(1);
        self
    }

    /// Cluster the collected suggestions. No suggestions, or no answer from
    /// the LLM, yields an empty theme list.
    pub async fn analyze(
        &self,
        seeds: &[String],
        records: &[SuggestionRecord],
        language: &str,
    ) -> Result<Vec<ThemeDescriptor>, ThemeError> {
        let texts: Vec<&str> = records
            .iter()
            .filter(|r| r.level > 0)
            .map(|r| r.text.as_str())
            .collect();
        let mut suggestions = dedup_texts(&texts);
        suggestions.truncate(self.max_suggestions);

        if suggestions.is_empty() {
            tracing::info!("no suggestions to analyse, skipping theme analysis");
            return Ok(Vec::new());
        }

        let prompt = build_theme_prompt(seeds, &suggestions, language);
        tracing::info!(suggestions = suggestions.len(), "analysing themes");

        let Some(response) = generate_or_none(self.generator.as_ref(), &self.retry, &prompt).await
        else {
            return Ok(Vec::new());
        };

        let themes = parse_themes(&response)?;
        tracing::info!(themes = themes.len(), "theme analysis completed");
        Ok(themes)
    }
}
