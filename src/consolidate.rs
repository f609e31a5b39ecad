//! Merge near-duplicate generated texts into ranked, unique items.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One generated text and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub text: String,
    pub source_keyword: String,
    pub source_suggestion: String,
}

impl RawCandidate {
    pub fn new(
        text: impl Into<String>,
        source_keyword: impl Into<String>,
        source_suggestion: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_keyword: source_keyword.into(),
            source_suggestion: source_suggestion.into(),
        }
    }
}

/// A deduplicated candidate with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedItem {
    pub normalized_key: String,
    /// First surface form seen for this key
    pub original_text: String,
    pub occurrence_count: usize,
    pub source_keywords: BTreeSet<String>,
    pub source_suggestions: BTreeSet<String>,
}

impl ConsolidatedItem {
    fn rank(&self) -> (usize, usize) {
        (self.occurrence_count, self.source_keywords.len())
    }
}

/// Lowercase, drop everything that is neither alphanumeric nor whitespace,
/// trim.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Group candidates by normalized text, rank them by
/// `(occurrence_count, distinct source keywords)` descending and keep the
/// first `target_count`. Ties keep encounter order.
///
/// Every candidate lands in exactly one item; texts that normalize to
/// nothing share the empty key.
pub fn consolidate(candidates: &[RawCandidate], target_count: usize) -> Vec<ConsolidatedItem> {
    if candidates.is_empty() || target_count == 0 {
        return Vec::new();
    }

    let mut items: Vec<ConsolidatedItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let key = normalize(&candidate.text);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            items.push(ConsolidatedItem {
                normalized_key: key,
                original_text: candidate.text.trim().to_string(),
                occurrence_count: 0,
                source_keywords: BTreeSet::new(),
                source_suggestions: BTreeSet::new(),
            });
            items.len() - 1
        });

        let item = &mut items[slot];
        item.occurrence_count += 1;
        item.source_keywords.insert(candidate.source_keyword.clone());
        item.source_suggestions.insert(candidate.source_suggestion.clone());
    }

    let unique = items.len();
    // sort_by is stable
    items.sort_by(|a, b| b.rank().cmp(&a.rank()));
    items.truncate(target_count);

    tracing::debug!(
        candidates = candidates.len(),
        unique,
        kept = items.len(),
        "consolidated candidates"
    );

    items
}

/// Keep the first surface form of each normalized text, in order
pub fn dedup_texts<S: AsRef<str>>(texts: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    texts
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| {
            let key = normalize(t);
            !key.is_empty() && seen.insert(key)
        })
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str) -> RawCandidate {
        RawCandidate::new(t, "", "")
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Où manger à Paris?"), "où manger à paris");
        assert_eq!(normalize("  Quel est le prix ?!  "), "quel est le prix");
        assert_eq!(normalize("l'hôtel"), "lhôtel");
    }

    #[test]
    fn test_normalize_drops_underscores() {
        assert_eq!(normalize("How_to start?"), "howto start");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in ["Où manger à Paris?", "  A--B  ", "C'est l'été!", "İstanbul", ""] {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_same_source_does_not_inflate_sets() {
        let candidates = vec![
            RawCandidate::new("Q one?", "paris", "paris hotel"),
            RawCandidate::new("q one", "paris", "paris hotel"),
            RawCandidate::new("Q ONE", "lyon", "lyon hotel"),
        ];
        let items = consolidate(&candidates, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].occurrence_count, 3);
        assert_eq!(items[0].source_keywords.len(), 2);
        assert_eq!(items[0].source_suggestions.len(), 2);
        assert_eq!(items[0].original_text, "Q one?");
    }

    #[test]
    fn test_ranking_uses_keyword_count_as_tiebreak() {
        let candidates = vec![
            RawCandidate::new("alpha", "k1", "s1"),
            RawCandidate::new("alpha", "k1", "s2"),
            RawCandidate::new("beta", "k1", "s1"),
            RawCandidate::new("beta", "k2", "s1"),
            RawCandidate::new("gamma", "k1", "s1"),
        ];
        let items = consolidate(&candidates, 10);
        let order: Vec<&str> = items.iter().map(|i| i.original_text.as_str()).collect();
        assert_eq!(order, vec!["beta", "alpha", "gamma"]);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let candidates = vec![text("first"), text("second"), text("third")];
        let items = consolidate(&candidates, 10);
        let order: Vec<&str> = items.iter().map(|i| i.original_text.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_zero_target_is_empty() {
        assert!(consolidate(&[text("a question")], 0).is_empty());
    }

    #[test]
    fn test_punctuation_only_candidates_share_the_empty_key() {
        let candidates = vec![text("?!"), text("real question"), text("...")];
        let items = consolidate(&candidates, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].normalized_key, "");
        assert_eq!(items[0].original_text, "?!");
        assert_eq!(items[0].occurrence_count, 2);
        let total: usize = items.iter().map(|i| i.occurrence_count).sum();
        assert_eq!(total, candidates.len());
    }

    #[test]
    fn test_empty_sources_are_recorded() {
        let items = consolidate(&[text("a question")], 10);
        assert!(items[0].source_keywords.contains(""));
        assert!(items[0].source_suggestions.contains(""));
    }

    #[test]
    fn test_dedup_texts_keeps_first_form() {
        let texts = ["Où manger ?", "où manger", "Que voir"];
        assert_eq!(dedup_texts(&texts), vec!["Où manger ?", "Que voir"]);
    }
}
