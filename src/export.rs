//! CSV and JSON export of an analysis run.

use crate::consolidate::ConsolidatedItem;
use crate::questions::ThemeYield;
use crate::state::{AnalysisState, Stage};
use crate::suggest::SuggestionRecord;
use crate::themes::ThemeDescriptor;
use crate::volume::{EnrichedKeyword, Enrichment, VolumeIndex};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAX_SLUG_CHARS: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rows that can be written as CSV
pub trait CsvRow {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// One collected suggestion, with volume data when available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRow {
    pub keyword: String,
    pub level: u8,
    pub suggestion: String,
    pub parent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_volume: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition_level: Option<String>,
}

impl SuggestionRow {
    pub fn from_record(record: &SuggestionRecord, volumes: Option<&VolumeIndex<'_>>) -> Self {
        let metrics = volumes.and_then(|index| index.get(&record.text));
        Self {
            keyword: record.keyword.clone(),
            level: record.level,
            suggestion: record.text.clone(),
            parent: record.parent.clone().unwrap_or_default(),
            search_volume: metrics.map(|m| m.search_volume),
            cpc: metrics.map(|m| m.cpc),
            competition_level: metrics.map(|m| m.competition_level.clone()),
        }
    }
}

impl CsvRow for SuggestionRow {
    fn header() -> &'static [&'static str] {
        &[
            "keyword",
            "level",
            "suggestion",
            "parent",
            "search_volume",
            "cpc",
            "competition_level",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.keyword.clone(),
            self.level.to_string(),
            self.suggestion.clone(),
            self.parent.clone(),
            self.search_volume.map(|v| v.to_string()).unwrap_or_default(),
            self.cpc.map(|v| format!("{v:.2}")).unwrap_or_default(),
            self.competition_level.clone().unwrap_or_default(),
        ]
    }
}

/// One consolidated question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRow {
    pub text: String,
    /// Occurrence count after consolidation
    pub score: usize,
    pub keyword_count: usize,
    pub suggestion_count: usize,
}

impl From<&ConsolidatedItem> for QuestionRow {
    fn from(item: &ConsolidatedItem) -> Self {
        Self {
            text: item.original_text.clone(),
            score: item.occurrence_count,
            keyword_count: item.source_keywords.len(),
            suggestion_count: item.source_suggestions.len(),
        }
    }
}

impl CsvRow for QuestionRow {
    fn header() -> &'static [&'static str] {
        &["text", "score", "keyword_count", "suggestion_count"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.text.clone(),
            self.score.to_string(),
            self.keyword_count.to_string(),
            self.suggestion_count.to_string(),
        ]
    }
}

/// Quote a field when it holds a delimiter, quote or line break
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

pub fn to_csv<R: CsvRow>(rows: &[R]) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, R::header().iter().copied());
    for row in rows {
        let fields = row.fields();
        push_csv_line(&mut out, fields.iter().map(String::as_str));
    }
    out
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(field));
    }
    out.push_str("\r\n");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub run_id: Uuid,
    pub date: DateTime<Utc>,
    pub seeds: Vec<String>,
    pub language: String,
    pub stage: Stage,
    pub total_suggestions: usize,
    pub level_distribution: BTreeMap<u8, usize>,
}

/// Full JSON dump of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub metadata: ReportMetadata,
    pub suggestions: Vec<SuggestionRow>,
    pub enriched_keywords: Vec<EnrichedKeyword>,
    pub themes: Vec<ThemeDescriptor>,
    pub question_yields: Vec<ThemeYield>,
    pub questions: Vec<QuestionRow>,
}

impl ExportReport {
    pub fn from_state(state: &AnalysisState) -> Self {
        Self {
            metadata: ReportMetadata {
                run_id: state.run_id,
                date: state.created_at,
                seeds: state.seeds.clone(),
                language: state.language.clone(),
                stage: state.stage,
                total_suggestions: state.suggestion_count(),
                level_distribution: state.level_counts.clone(),
            },
            suggestions: suggestion_rows(state),
            enriched_keywords: state
                .enrichment
                .as_ref()
                .map(|e| e.enriched.clone())
                .unwrap_or_default(),
            themes: state.themes.clone(),
            question_yields: state.question_yields.clone(),
            questions: question_rows(state),
        }
    }
}

/// Suggestions of a run, seeds excluded
pub fn suggestion_rows(state: &AnalysisState) -> Vec<SuggestionRow> {
    let index = state.enrichment.as_ref().map(Enrichment::index);
    state
        .records
        .iter()
        .filter(|r| r.level > 0)
        .map(|r| SuggestionRow::from_record(r, index.as_ref()))
        .collect()
}

pub fn question_rows(state: &AnalysisState) -> Vec<QuestionRow> {
    state.questions.iter().map(QuestionRow::from).collect()
}

/// Lowercase alphanumerics, everything else collapsed into `_`
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    slug.chars().take(MAX_SLUG_CHARS).collect()
}

/// `{prefix}_{slug}_{lang}_{HHMM_ddmmYYYY}.{ext}`
pub fn export_file_name(
    prefix: &str,
    seeds: &[String],
    language: &str,
    at: DateTime<Local>,
    extension: &str,
) -> String {
    let slug = match slugify(&seeds.join(" ")) {
        s if s.is_empty() => "run".to_string(),
        s => s,
    };
    format!(
        "{prefix}_{slug}_{language}_{}.{extension}",
        at.format("%H%M_%d%m%Y")
    )
}

/// Writes export files into one directory
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, content).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = content.len(), "export written");
        Ok(path)
    }

    fn file_name(&self, prefix: &str, state: &AnalysisState, extension: &str) -> String {
        export_file_name(prefix, &state.seeds, &state.language, Local::now(), extension)
    }

    pub fn write_suggestions_csv(&self, state: &AnalysisState) -> Result<PathBuf, ExportError> {
        let csv = to_csv(&suggestion_rows(state));
        self.write(&self.file_name("suggestions", state, "csv"), &csv)
    }

    pub fn write_questions_csv(&self, state: &AnalysisState) -> Result<PathBuf, ExportError> {
        let csv = to_csv(&question_rows(state));
        self.write(&self.file_name("questions", state, "csv"), &csv)
    }

    pub fn write_report_json(&self, state: &AnalysisState) -> Result<PathBuf, ExportError> {
        let json = serde_json::to_string_pretty(&ExportReport::from_state(state))?;
        self.write(&self.file_name("analysis", state, "json"), &json)
    }

    /// Every export that has content at the state's stage
    pub fn write_all(&self, state: &AnalysisState) -> Result<Vec<PathBuf>, ExportError> {
        let mut written = Vec::new();
        if state.suggestion_count() > 0 {
            written.push(self.write_suggestions_csv(state)?);
        }
        if state.stage == Stage::QuestionsGenerated && !state.questions.is_empty() {
            written.push(self.write_questions_csv(state)?);
        }
        written.push(self.write_report_json(state)?);
        Ok(written)
    }
}
