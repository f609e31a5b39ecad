//! Query modifiers: question prefixes and suffix categories combined with a
//! seed to widen the level-1 crawl.

use std::collections::{BTreeMap, HashSet};

/// Category whose words are used as prefixes; every other category is a suffix
pub const QUESTION_CATEGORY: &str = "question";

const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("question", &["comment", "quelle", "quel", "est ce que", "combien"]),
    ("localisation", &["centre", "gare", "quartier"]),
    ("proximite", &["proche", "pres de", "a cote"]),
    ("economy", &["pas cher", "economique", "abordable"]),
    ("midscale", &["3 etoiles", "moyen de gamme", "standard"]),
    ("luxury", &["luxe", "haut de gamme", "premium"]),
    ("promotion", &["promo", "bon plan", "reduction"]),
    ("cible", &["famille", "business", "professionnel"]),
    ("service", &["spa", "restaurant", "parking"]),
    ("renseignement", &["adresse", "avis", "telephone"]),
    ("style", &["moderne", "charme", "contemporain"]),
    ("evenement", &["ce soir", "derniere minute", "saint valentin"]),
];

/// Built-in category table used when the config does not provide one
pub fn default_categories() -> BTreeMap<String, Vec<String>> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, words)| {
            (
                name.to_string(),
                words.iter().map(|w| w.to_string()).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierSet {
    pub prefixes: Vec<String>,
    pub suffixes: BTreeMap<String, Vec<String>>,
}

impl ModifierSet {
    /// Split a category table into prefixes and suffixes. A table without a
    /// question category falls back to the built-in question words.
    pub fn from_categories(categories: &BTreeMap<String, Vec<String>>) -> Self {
        let prefixes = categories
            .get(QUESTION_CATEGORY)
            .cloned()
            .unwrap_or_else(|| {
                default_categories()
                    .remove(QUESTION_CATEGORY)
                    .unwrap_or_default()
            });

        let suffixes = categories
            .iter()
            .filter(|(name, _)| name.as_str() != QUESTION_CATEGORY)
            .map(|(name, words)| (name.clone(), words.clone()))
            .collect();

        Self { prefixes, suffixes }
    }

    /// Variant queries for `query`, prefixes first, then suffixes by category.
    /// The query itself and repeated variants are left out.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let query = query.trim();
        let mut seen = HashSet::new();
        seen.insert(query.to_lowercase());

        let prefixed = self
            .prefixes
            .iter()
            .map(|prefix| format!("{} {}", prefix.trim(), query));
        let suffixed = self
            .suffixes
            .values()
            .flatten()
            .map(|suffix| format!("{} {}", query, suffix.trim()));

        prefixed
            .chain(suffixed)
            .filter(|variant| seen.insert(variant.to_lowercase()))
            .collect()
    }

    pub fn variant_count(&self) -> usize {
        self.prefixes.len() + self.suffixes.values().map(Vec::len).sum::<usize>()
    }
}

impl Default for ModifierSet {
    fn default() -> Self {
        Self::from_categories(&default_categories())
    }
}
