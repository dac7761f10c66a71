//! Synonym expansion of input tokens.

use serde::{Deserialize, Serialize};

use crate::text::{FuzzyConfig, phrase_words};

/// One canonical term and the aliases that imply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synonym {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl Synonym {
    pub fn new(canonical: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Ordered canonical-term table.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    groups: Vec<SynonymGroup>,
}

#[derive(Debug, Clone)]
struct SynonymGroup {
    canonical: String,
    /// Each alias pre-split into normalized words.
    aliases: Vec<Vec<String>>,
}

impl SynonymMap {
    pub fn new(synonyms: impl IntoIterator<Item = Synonym>) -> Self {
        let groups = synonyms
            .into_iter()
            .map(|s| SynonymGroup {
                canonical: s.canonical.to_lowercase(),
                aliases: s
                    .aliases
                    .iter()
                    .map(|a| phrase_words(a))
                    .filter(|words| !words.is_empty())
                    .collect(),
            })
            .collect();
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Append the canonical term of every group with an alias present in
    /// `tokens`.
    ///
    /// The original tokens come first and keep their order. A canonical term
    /// is appended at most once. Tokens shorter than
    /// `fuzzy.synonym_min_len` are ignored, and a multi-word alias needs all
    /// of its words present.
    pub fn expand(&self, tokens: &[String], fuzzy: &FuzzyConfig) -> Vec<String> {
        let eligible: Vec<String> = tokens
            .iter()
            .filter(|t| t.chars().count() >= fuzzy.synonym_min_len)
            .cloned()
            .collect();

        let mut expanded = tokens.to_vec();
        if eligible.is_empty() {
            return expanded;
        }

        for group in &self.groups {
            if expanded.contains(&group.canonical) {
                continue;
            }
            let hit = group
                .aliases
                .iter()
                .any(|words| words.iter().all(|w| fuzzy.matches_any(&eligible, w)));
            if hit {
                expanded.push(group.canonical.clone());
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    fn map() -> SynonymMap {
        SynonymMap::new([
            Synonym::new("hire", &["recruit", "employ"]),
            Synonym::new("resume", &["cv", "download"]),
            Synonym::new("leadership", &["manage", "soft skills"]),
        ])
    }

    #[test]
    fn test_alias_appends_canonical() {
        let expanded = map().expand(&normalize("would you recruit her"), &FuzzyConfig::default());
        assert_eq!(expanded, vec!["would", "you", "recruit", "her", "hire"]);
    }

    #[test]
    fn test_fuzzy_alias_match() {
        let expanded = map().expand(&normalize("recruiting"), &FuzzyConfig::default());
        assert!(expanded.contains(&"hire".to_string()));
    }

    #[test]
    fn test_short_tokens_do_not_expand() {
        let expanded = map().expand(&normalize("cv"), &FuzzyConfig::default());
        assert_eq!(expanded, vec!["cv"]);
    }

    #[test]
    fn test_canonical_not_duplicated() {
        let expanded = map().expand(&normalize("hire recruit employ"), &FuzzyConfig::default());
        assert_eq!(expanded.iter().filter(|t| *t == "hire").count(), 1);
    }

    #[test]
    fn test_multi_word_alias_needs_every_word() {
        let fuzzy = FuzzyConfig::default();
        assert!(!map().expand(&normalize("what are your skills"), &fuzzy).contains(&"leadership".to_string()));
        assert!(map().expand(&normalize("her soft skills"), &fuzzy).contains(&"leadership".to_string()));
    }
}
