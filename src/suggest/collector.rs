use super::modifiers::ModifierSet;
use super::pacing::{NoDelay, Pacer};
use super::{visit_key, LevelPlan, SuggestProvider, SuggestionRecord};
use crate::retry::RetryPolicy;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Errors reported by a collection run
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollectError {
    #[error("Seed keyword cannot be empty")]
    EmptySeed,

    #[error("No seed keywords provided")]
    NoSeeds,

    #[error("No suggestions collected for any seed keyword")]
    NoSuggestions,
}

/// One query to send, and the suggestion its results hang under
struct Branch {
    query: String,
    parent: String,
}

/// Breadth-first autocomplete crawler
///
/// Expands a seed keyword over up to three levels of suggestions. A single
/// visited set per seed keeps every suggestion text unique; a failed branch
/// contributes nothing and never stops its siblings.
pub struct SuggestionCollector {
    provider: Arc<dyn SuggestProvider>,
    pacer: Arc<dyn Pacer>,
    retry: RetryPolicy,
    concurrency: usize,
    modifiers: Option<ModifierSet>,
}

impl SuggestionCollector {
    pub fn new(provider: Arc<dyn SuggestProvider>) -> Self {
        Self {
            provider,
            pacer: Arc::new(NoDelay),
            retry: RetryPolicy::default(),
            concurrency: 1,
            modifiers: None,
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Calls in flight per level (1 = strictly sequential)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Also query prefix/suffix variants of the seed at level 1
    pub fn with_modifiers(mut self, modifiers: Option<ModifierSet>) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Collect the suggestion tree of one seed keyword
    pub async fn collect(
        &self,
        seed: &str,
        language: &str,
        plan: &LevelPlan,
    ) -> Result<Vec<SuggestionRecord>, CollectError> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Err(CollectError::EmptySeed);
        }

        if plan.enabled[1] && !plan.enabled[0] {
            tracing::debug!(seed = %seed, "level 3 requested without level 2, skipping it");
        }

        tracing::info!(
            seed = %seed,
            language = %language,
            counts = ?plan.counts,
            depth = plan.depth(),
            "collecting suggestions"
        );

        let mut visited = HashSet::new();
        visited.insert(visit_key(seed));
        let mut records = vec![SuggestionRecord::seed(seed)];

        let mut roots = vec![Branch {
            query: seed.to_string(),
            parent: seed.to_string(),
        }];
        if let Some(modifiers) = &self.modifiers {
            roots.extend(modifiers.expand(seed).into_iter().map(|query| Branch {
                query,
                parent: seed.to_string(),
            }));
        }

        let level1 = self
            .expand_level(seed, 1, roots, plan.counts[0], language, &mut visited, &mut records)
            .await;

        if plan.level2_enabled() {
            let level2 = self
                .expand_level(
                    seed,
                    2,
                    branches_from(level1),
                    plan.counts[1],
                    language,
                    &mut visited,
                    &mut records,
                )
                .await;

            if plan.level3_enabled() {
                self.expand_level(
                    seed,
                    3,
                    branches_from(level2),
                    plan.counts[2],
                    language,
                    &mut visited,
                    &mut records,
                )
                .await;
            }
        }

        tracing::info!(
            seed = %seed,
            total = records.len(),
            "suggestion collection finished"
        );

        Ok(records)
    }

    /// Collect every seed in turn. Blank and repeated seeds are skipped.
    ///
    /// Fails only when there is no usable seed, or when not a single
    /// suggestion was found across all seeds and levels.
    pub async fn collect_all(
        &self,
        seeds: &[String],
        language: &str,
        plan: &LevelPlan,
    ) -> Result<Vec<SuggestionRecord>, CollectError> {
        let mut seen = HashSet::new();
        let seeds: Vec<&str> = seeds
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && seen.insert(visit_key(s)))
            .collect();

        if seeds.is_empty() {
            return Err(CollectError::NoSeeds);
        }

        let mut all = Vec::new();
        for seed in seeds {
            match self.collect(seed, language, plan).await {
                Ok(records) => all.extend(records),
                Err(e) => tracing::warn!(seed = %seed, error = %e, "seed skipped"),
            }
        }

        if all.iter().all(|r| r.level == 0) {
            return Err(CollectError::NoSuggestions);
        }

        Ok(all)
    }

    /// Run one level: one call per branch, then insert results in branch
    /// order through the visited set. Returns the texts that were added.
    #[allow(clippy::too_many_arguments)]
    async fn expand_level(
        &self,
        seed: &str,
        level: u8,
        branches: Vec<Branch>,
        limit: usize,
        language: &str,
        visited: &mut HashSet<String>,
        records: &mut Vec<SuggestionRecord>,
    ) -> Vec<String> {
        if limit == 0 || branches.is_empty() {
            return Vec::new();
        }

        tracing::debug!(seed = %seed, level, branches = branches.len(), limit, "expanding level");

        let results: Vec<Vec<String>> = stream::iter(branches.iter())
            .map(|branch| self.fetch(&branch.query, language, limit))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut added = Vec::new();
        for (branch, suggestions) in branches.iter().zip(results) {
            for suggestion in suggestions {
                let text = suggestion.trim();
                if text.is_empty() || !visited.insert(visit_key(text)) {
                    tracing::trace!(suggestion = %text, level, "duplicate dropped");
                    continue;
                }

                records.push(SuggestionRecord {
                    keyword: seed.to_string(),
                    level,
                    text: text.to_string(),
                    parent: Some(branch.parent.clone()),
                });
                added.push(text.to_string());
            }
        }

        tracing::debug!(seed = %seed, level, added = added.len(), "level expanded");
        added
    }

    /// One external call with retries. Failures become an empty result.
    async fn fetch(&self, query: &str, language: &str, limit: usize) -> Vec<String> {
        let result = self
            .retry
            .run(query, || self.provider.suggest(query, language, limit))
            .await;
        self.pacer.pause().await;

        match result {
            Ok(mut suggestions) => {
                suggestions.truncate(limit);
                suggestions
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "suggestion branch failed");
                Vec::new()
            }
        }
    }
}

fn branches_from(texts: Vec<String>) -> Vec<Branch> {
    texts
        .into_iter()
        .map(|text| Branch {
            query: text.clone(),
            parent: text,
        })
        .collect()
}
