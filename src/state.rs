//! The value threaded through an analysis run.

use crate::consolidate::ConsolidatedItem;
use crate::questions::ThemeYield;
use crate::suggest::{level_distribution, visit_key, SuggestionRecord};
use crate::themes::ThemeDescriptor;
use crate::volume::Enrichment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// How far a run has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Empty,
    SuggestionsCollected,
    ThemesAnalyzed,
    QuestionsGenerated,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Empty => "empty",
            Stage::SuggestionsCollected => "suggestions_collected",
            Stage::ThemesAnalyzed => "themes_analyzed",
            Stage::QuestionsGenerated => "questions_generated",
        };
        f.write_str(name)
    }
}

/// Everything one run has produced so far
///
/// Each pipeline step takes the state by value and hands back the next one,
/// so a run can be stopped after any stage, inspected, and resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub seeds: Vec<String>,
    pub language: String,
    pub stage: Stage,
    pub records: Vec<SuggestionRecord>,
    pub level_counts: BTreeMap<u8, usize>,
    pub enrichment: Option<Enrichment>,
    pub themes: Vec<ThemeDescriptor>,
    /// Theme names to generate questions for; `None` means every theme
    pub selected_themes: Option<Vec<String>>,
    pub question_yields: Vec<ThemeYield>,
    pub questions: Vec<ConsolidatedItem>,
}

impl AnalysisState {
    pub fn new(seeds: Vec<String>, language: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            seeds,
            language: language.into(),
            stage: Stage::Empty,
            records: Vec::new(),
            level_counts: BTreeMap::new(),
            enrichment: None,
            themes: Vec::new(),
            selected_themes: None,
            question_yields: Vec::new(),
            questions: Vec::new(),
        }
    }

    pub fn with_selected_themes(mut self, names: Vec<String>) -> Self {
        self.selected_themes = Some(names);
        self
    }

    /// Store collection results and move to `SuggestionsCollected`.
    /// Later-stage results are cleared.
    pub fn set_records(&mut self, records: Vec<SuggestionRecord>) {
        self.level_counts = level_distribution(&records);
        self.records = records;
        self.enrichment = None;
        self.themes.clear();
        self.question_yields.clear();
        self.questions.clear();
        self.stage = Stage::SuggestionsCollected;
    }

    pub fn set_themes(&mut self, themes: Vec<ThemeDescriptor>) {
        self.themes = themes;
        self.question_yields.clear();
        self.questions.clear();
        self.stage = Stage::ThemesAnalyzed;
    }

    /// Themes questions should be generated for
    pub fn active_themes(&self) -> Vec<ThemeDescriptor> {
        match &self.selected_themes {
            None => self.themes.clone(),
            Some(names) => {
                let wanted: HashSet<String> = names.iter().map(|n| visit_key(n)).collect();
                self.themes
                    .iter()
                    .filter(|t| wanted.contains(&visit_key(&t.name)))
                    .cloned()
                    .collect()
            }
        }
    }

    /// Number of suggestions collected, seeds excluded
    pub fn suggestion_count(&self) -> usize {
        self.records.iter().filter(|r| r.level > 0).count()
    }
}
