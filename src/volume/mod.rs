//! Keyword volume / cost enrichment.

pub mod dataforseo;

pub use dataforseo::DataForSeoClient;

use crate::retry::Transient;
use crate::suggest::{visit_key, SuggestionRecord};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Keyword metrics provider abstraction
#[async_trait::async_trait]
pub trait VolumeProvider: Send + Sync {
    /// Monthly search volume and cost data for `keywords`
    async fn search_volume(
        &self,
        keywords: &[String],
        language: &str,
        location: &str,
    ) -> Result<Vec<VolumeRecord>, VolumeError>;
}

/// Metrics of one keyword. Missing numbers are reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub keyword: String,
    pub search_volume: u64,
    pub cpc: f64,
    /// 0.0 (none) to 1.0 (highest)
    pub competition: f64,
    /// `LOW`, `MEDIUM`, `HIGH` or `UNKNOWN`
    pub competition_level: String,
}

impl VolumeRecord {
    /// Zeroed metrics for a keyword the provider knows nothing about
    pub fn unknown(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            search_volume: 0,
            cpc: 0.0,
            competition: 0.0,
            competition_level: "UNKNOWN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordOrigin {
    /// A seed keyword
    Original,
    Suggestion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedKeyword {
    #[serde(flatten)]
    pub metrics: VolumeRecord,
    pub origin: KeywordOrigin,
}

/// Result of merging volume data into a collection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub volume_data: Vec<VolumeRecord>,
    /// Records at or above the minimum volume
    pub keywords_with_volume: Vec<VolumeRecord>,
    /// Seeds first (zeroed when unknown), then suggestions with data
    pub enriched: Vec<EnrichedKeyword>,
}

impl Enrichment {
    /// Case-insensitive index over `volume_data`
    pub fn index(&self) -> VolumeIndex<'_> {
        VolumeIndex::new(&self.volume_data)
    }
}

/// Volume records keyed by `visit_key`; the first record for a key wins
#[derive(Debug, Default)]
pub struct VolumeIndex<'a> {
    by_key: HashMap<String, &'a VolumeRecord>,
}

impl<'a> VolumeIndex<'a> {
    pub fn new(volumes: &'a [VolumeRecord]) -> Self {
        let mut by_key = HashMap::with_capacity(volumes.len());
        for volume in volumes {
            by_key.entry(visit_key(&volume.keyword)).or_insert(volume);
        }
        Self { by_key }
    }

    /// Volume of `text`, when known
    pub fn get(&self, text: &str) -> Option<&'a VolumeRecord> {
        self.by_key.get(&visit_key(text)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Volume provider errors
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Volume provider rejected the credentials")]
    Unauthorized,

    #[error("Volume API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Volume task failed ({code}): {message}")]
    Task { code: u64, message: String },

    #[error("Malformed volume response: {0}")]
    Malformed(String),

    #[error("Volume request timed out after {0}ms")]
    Timeout(u64),

    #[error("Volume provider is not configured (login and password required)")]
    NotConfigured,
}

impl Transient for VolumeError {
    fn is_transient(&self) -> bool {
        match self {
            VolumeError::Network(_) | VolumeError::Timeout(_) => true,
            VolumeError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        VolumeError::Timeout(after.as_millis() as u64)
    }
}

/// Every distinct text of a run (seeds and suggestions), first form kept
pub fn unique_keywords(records: &[SuggestionRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty() && seen.insert(visit_key(t)))
        .map(|t| t.to_string())
        .collect()
}

/// Merge provider data into the run. Keywords are matched case-insensitively.
pub fn enrich(records: &[SuggestionRecord], volumes: Vec<VolumeRecord>, min_volume: u64) -> Enrichment {
    let keywords_with_volume: Vec<VolumeRecord> = volumes
        .iter()
        .filter(|v| v.search_volume >= min_volume)
        .cloned()
        .collect();

    let index = VolumeIndex::new(&volumes);

    let mut seeds_seen = HashSet::new();
    let mut enriched: Vec<EnrichedKeyword> = records
        .iter()
        .filter(|r| r.level == 0 && seeds_seen.insert(visit_key(&r.text)))
        .map(|r| EnrichedKeyword {
            metrics: index
                .get(&r.text)
                .cloned()
                .unwrap_or_else(|| VolumeRecord::unknown(r.text.clone())),
            origin: KeywordOrigin::Original,
        })
        .collect();

    let mut listed = seeds_seen;
    enriched.extend(
        volumes
            .iter()
            .filter(|v| listed.insert(visit_key(&v.keyword)))
            .map(|v| EnrichedKeyword {
                metrics: v.clone(),
                origin: KeywordOrigin::Suggestion,
            }),
    );

    tracing::info!(
        received = volumes.len(),
        above_minimum = keywords_with_volume.len(),
        min_volume,
        "volume data merged"
    );

    Enrichment {
        volume_data: volumes,
        keywords_with_volume,
        enriched,
    }
}
