//! Conversational question generation, one LLM call per theme.

use crate::allocate::allocate;
use crate::consolidate::{consolidate, ConsolidatedItem, RawCandidate};
use crate::llm::{generate_or_none, TextGenerator};
use crate::retry::RetryPolicy;
use crate::suggest::{visit_key, SuggestionRecord};
use crate::themes::{json_slice, ThemeDescriptor};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Items of this many characters or fewer are dropped by the list parser
const MIN_ITEM_CHARS: usize = 10;

/// Most items read from one plain-list answer
const MAX_LIST_ITEMS: usize = 10;

/// A question and the suggestion it answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    pub text: String,
    pub suggestion: String,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default, alias = "text")]
    question: String,
    #[serde(default, alias = "source")]
    suggestion: String,
}

/// What one theme was asked for and what it delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeYield {
    pub theme: String,
    pub allocated: usize,
    pub produced: usize,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionOutcome {
    pub candidates: Vec<RawCandidate>,
    pub yields: Vec<ThemeYield>,
    pub consolidated: Vec<ConsolidatedItem>,
}

pub fn build_question_prompt(theme: &ThemeDescriptor, count: usize, language: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Write {count} conversational questions that people would ask a search engine or a voice assistant about the theme \"{}\".\n",
        theme.name
    ));
    if !theme.concepts.is_empty() {
        prompt.push_str(&format!("Key concepts: {}.\n", theme.concepts.join(", ")));
    }
    if !theme.intent.is_empty() {
        prompt.push_str(&format!("Dominant search intent: {}.\n", theme.intent));
    }
    if !theme.examples.is_empty() {
        prompt.push_str("Search suggestions for this theme:\n");
        for example in &theme.examples {
            prompt.push_str(&format!("- {}\n", example));
        }
    }
    prompt.push_str(&format!(
        "\nAnswer in the language with code '{language}'. Reply with a JSON array only:\n\
         [{{\"question\": \"...\", \"suggestion\": \"the search suggestion it answers\"}}]"
    ));
    prompt
}

/// Numbered (`1.`, `1)`, `1`), dashed, starred or bulleted line
fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d+[.)]?|[-•*])\s*(.+)$").expect("valid list marker pattern"))
}

/// Pull list items out of free text: numbered, dashed and bulleted lines.
/// Surrounding quotes are removed, short items dropped, and at most
/// ten items kept.
pub fn extract_list_items(text: &str) -> Vec<String> {
    let marker = list_marker();
    text.lines()
        .filter_map(|line| marker.captures(line.trim()))
        .filter_map(|caps| caps.get(1).map(|m| clean_item(m.as_str())))
        .filter(|item| item.chars().count() > MIN_ITEM_CHARS)
        .take(MAX_LIST_ITEMS)
        .collect()
}

fn clean_item(raw: &str) -> String {
    raw.trim()
        .trim_matches('*')
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '«' | '»' | '“' | '”'))
        .trim()
        .to_string()
}

/// Read the LLM's question answer. JSON is preferred; plain lists are
/// accepted too, with suggestions assigned from the theme's examples in turn.
pub fn parse_questions(response: &str, theme: &ThemeDescriptor) -> Vec<GeneratedQuestion> {
    let example_for = |i: usize| -> String {
        if theme.examples.is_empty() {
            String::new()
        } else {
            theme.examples[i % theme.examples.len()].clone()
        }
    };

    let parsed = json_slice(response, '[', ']')
        .and_then(|payload| serde_json::from_str::<Vec<RawQuestion>>(payload).ok());

    if let Some(raw) = parsed {
        let questions: Vec<GeneratedQuestion> = raw
            .into_iter()
            .map(|q| (q.question.trim().to_string(), q.suggestion.trim().to_string()))
            .filter(|(text, _)| !text.is_empty())
            .enumerate()
            .map(|(i, (text, suggestion))| GeneratedQuestion {
                suggestion: if suggestion.is_empty() { example_for(i) } else { suggestion },
                text,
            })
            .collect();
        if !questions.is_empty() {
            return questions;
        }
    }

    tracing::debug!(theme = %theme.name, "question answer is not JSON, reading it as a list");
    extract_list_items(response)
        .into_iter()
        .enumerate()
        .map(|(i, text)| GeneratedQuestion {
            text,
            suggestion: example_for(i),
        })
        .collect()
}

/// Generates questions theme by theme and consolidates them
pub struct QuestionGenerator {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
}

impl QuestionGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy) -> Self {
        Self { generator, retry }
    }

    /// Split `target_count` across `themes`, ask each theme for its share,
    /// and consolidate everything down to `target_count` items.
    ///
    /// A theme whose call fails, or that returns fewer questions than its
    /// share, simply contributes less.
    pub async fn generate(
        &self,
        themes: &[ThemeDescriptor],
        records: &[SuggestionRecord],
        seeds: &[String],
        language: &str,
        target_count: usize,
    ) -> QuestionOutcome {
        let keyword_of: HashMap<String, &str> = records
            .iter()
            .map(|r| (visit_key(&r.text), r.keyword.as_str()))
            .collect();
        let fallback_keyword = seeds.first().map(|s| s.trim()).unwrap_or_default();

        let mut outcome = QuestionOutcome::default();

        for budget in allocate(themes, target_count) {
            let theme = &themes[budget.theme_index];
            if budget.count == 0 {
                outcome.yields.push(ThemeYield {
                    theme: theme.name.clone(),
                    allocated: 0,
                    produced: 0,
                });
                continue;
            }

            tracing::info!(theme = %theme.name, count = budget.count, "generating questions");

            let prompt = build_question_prompt(theme, budget.count, language);
            let mut questions =
                match generate_or_none(self.generator.as_ref(), &self.retry, &prompt).await {
                    Some(response) => parse_questions(&response, theme),
                    None => Vec::new(),
                };
            questions.truncate(budget.count);

            if questions.len() < budget.count {
                tracing::debug!(
                    theme = %theme.name,
                    allocated = budget.count,
                    produced = questions.len(),
                    "theme under-delivered"
                );
            }

            outcome.yields.push(ThemeYield {
                theme: theme.name.clone(),
                allocated: budget.count,
                produced: questions.len(),
            });

            let theme_keyword = theme
                .examples
                .iter()
                .find_map(|e| keyword_of.get(&visit_key(e)).copied())
                .unwrap_or(fallback_keyword);

            outcome
                .candidates
                .extend(questions.into_iter().map(|q| {
                    let keyword = keyword_of
                        .get(&visit_key(&q.suggestion))
                        .copied()
                        .unwrap_or(theme_keyword);
                    RawCandidate::new(q.text, keyword, q.suggestion)
                }));
        }

        outcome.consolidated = consolidate(&outcome.candidates, target_count);

        tracing::info!(
            candidates = outcome.candidates.len(),
            kept = outcome.consolidated.len(),
            "question generation completed"
        );

        outcome
    }
}
