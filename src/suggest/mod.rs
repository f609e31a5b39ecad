pub mod collector;
pub mod modifiers;
pub mod pacing;
pub mod providers;

pub use collector::{CollectError, SuggestionCollector};
pub use pacing::{FixedDelay, NoDelay, Pacer};

use crate::retry::Transient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Autocomplete provider abstraction - different endpoints can be plugged in
#[async_trait::async_trait]
pub trait SuggestProvider: Send + Sync {
    /// Fetch up to `limit` suggestions for `query`, in the endpoint's order
    async fn suggest(
        &self,
        query: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<String>, SuggestError>;
}

/// One node of the suggestion tree grown from a seed keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    /// Seed keyword this record traces back to
    pub keyword: String,
    /// 0 for the seed itself, then 1..=3
    pub level: u8,
    /// Suggestion text (equal to `keyword` at level 0)
    pub text: String,
    /// Text of the suggestion whose expansion produced this one
    pub parent: Option<String>,
}

impl SuggestionRecord {
    pub fn seed(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            text: keyword.clone(),
            keyword,
            level: 0,
            parent: None,
        }
    }
}

/// Identity used by the visited set: trimmed, lowercased
pub fn visit_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Number of records per level
pub fn level_distribution(records: &[SuggestionRecord]) -> BTreeMap<u8, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.level).or_insert(0) += 1;
    }
    counts
}

/// How deep and how wide to expand a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPlan {
    /// Suggestions requested per call at levels 1, 2 and 3
    pub counts: [usize; 3],
    /// `[level 2, level 3]`; level 3 only runs when level 2 does
    pub enabled: [bool; 2],
}

impl LevelPlan {
    pub fn new(counts: [usize; 3], enabled: [bool; 2]) -> Self {
        Self { counts, enabled }
    }

    /// A level is enabled when its count is positive
    pub fn from_counts(level1: usize, level2: usize, level3: usize) -> Self {
        Self {
            counts: [level1, level2, level3],
            enabled: [level2 > 0, level3 > 0 && level2 > 0],
        }
    }

    pub fn level2_enabled(&self) -> bool {
        self.enabled[0]
    }

    pub fn level3_enabled(&self) -> bool {
        self.enabled[0] && self.enabled[1]
    }

    /// Deepest level that can be produced
    pub fn depth(&self) -> u8 {
        if self.counts[0] == 0 {
            0
        } else if !self.level2_enabled() || self.counts[1] == 0 {
            1
        } else if !self.level3_enabled() || self.counts[2] == 0 {
            2
        } else {
            3
        }
    }
}

impl Default for LevelPlan {
    fn default() -> Self {
        Self::from_counts(10, 0, 0)
    }
}

/// Suggestion-related errors
#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

impl Transient for SuggestError {
    fn is_transient(&self) -> bool {
        !matches!(self, SuggestError::MalformedResponse(_))
    }

    fn timed_out(after: Duration) -> Self {
        SuggestError::Timeout(after.as_millis() as u64)
    }
}
