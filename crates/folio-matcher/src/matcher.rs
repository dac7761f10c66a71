//! The keyword matcher: pre-filter, score, select, fuse, remember.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::knowledge::{Answer, KnowledgeBase, KnowledgeEntry};
use crate::memory::ConversationMemory;
use crate::prefilter::PrefilterKind;
use crate::scoring::{Candidate, rank};
use crate::text::{FuzzyConfig, normalize};

/// Prepended to a topical answer the user has already seen.
pub const MEMORY_PREFIX: &str = "*We covered this before, but here's a refresher:*\n\n";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Matcher tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    pub fuzzy: FuzzyConfig,

    /// Runner-up share of the best total needed to fuse two answers.
    pub fusion_ratio: f64,

    /// A topical winner below this base score is treated as no match.
    pub min_topical_score: u32,

    /// Cap on merged suggestions after fusion.
    pub max_suggestions: usize,

    /// Track discussed topics and mark repeats.
    pub memory_enabled: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy: FuzzyConfig::default(),
            fusion_ratio: 0.7,
            min_topical_score: 2,
            max_suggestions: 4,
            memory_enabled: true,
        }
    }
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fuzzy(mut self, fuzzy: FuzzyConfig) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_fusion_ratio(mut self, ratio: f64) -> Self {
        self.fusion_ratio = ratio;
        self
    }

    pub fn with_min_topical_score(mut self, score: u32) -> Self {
        self.min_topical_score = score;
        self
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    pub fn with_memory(mut self, enabled: bool) -> Self {
        self.memory_enabled = enabled;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// How a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// One entry answered.
    Matched,
    /// Two topical entries were close enough to answer together.
    Fused,
    /// Nothing matched.
    Fallback,
    /// Answered by the pre-filter before scoring.
    Prefiltered(PrefilterKind),
}

/// The matcher's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub answer: String,
    pub suggestions: Vec<String>,
    pub kind: MatchKind,
    /// Topic key of the winning topical entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Matcher
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Rotation {
    Entry(usize),
    Fallback,
    DomainFallback,
    Prefilter(PrefilterKind),
}

/// Rule-based fuzzy keyword matcher over a [`KnowledgeBase`].
///
/// Each instance owns its conversation memory, its rotating-pool cursors and
/// its random source, so two matchers never influence each other.
pub struct KeywordMatcher {
    kb: Arc<KnowledgeBase>,
    config: MatcherConfig,
    memory: ConversationMemory,
    cursors: HashMap<Rotation, usize>,
    rng: StdRng,
}

impl KeywordMatcher {
    pub fn new(kb: impl Into<Arc<KnowledgeBase>>) -> Self {
        Self {
            kb: kb.into(),
            config: MatcherConfig::default(),
            memory: ConversationMemory::new(),
            cursors: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// A matcher over the built-in knowledge base.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(KnowledgeBase::builtin()?))
    }

    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the random source so random-pick answers are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Forget discussed topics. Pool cursors keep their place.
    pub fn reset_memory(&mut self) {
        self.memory.clear();
    }

    /// Answer one user message. Never fails: unmatched input gets a fallback.
    pub fn find_answer(&mut self, input: &str) -> MatchResult {
        let kb = Arc::clone(&self.kb);

        if let Some(kind) = kb.prefilter().classify(input) {
            debug!(?kind, "Input caught by pre-filter");
            return self.prefiltered(&kb, kind);
        }

        let tokens = normalize(input);
        let expanded = kb.synonyms().expand(&tokens, &self.config.fuzzy);
        let candidates = rank(kb.entries(), &expanded, &self.config.fuzzy);

        let Some(best) = candidates.first().copied() else {
            debug!(tokens = ?expanded, "No entry matched");
            return self.fallback(&kb, &tokens);
        };
        let entry = &kb.entries()[best.index];

        if entry.is_topical() && best.score.base < self.config.min_topical_score {
            debug!(
                index = best.index,
                base = best.score.base,
                min = self.config.min_topical_score,
                "Best topical match below threshold"
            );
            return self.fallback(&kb, &tokens);
        }

        let mut answer = self.resolve(best.index, entry.answer());
        let mut suggestions = self.suggestions_for(&kb, entry);
        let mut kind = MatchKind::Matched;

        if let Some(second) = self.fusion_partner(&kb, best, candidates.get(1).copied()) {
            let other = &kb.entries()[second.index];
            debug!(
                best = best.index,
                second = second.index,
                best_total = best.score.total,
                second_total = second.score.total,
                "Fusing answers"
            );
            let extra = self.resolve(second.index, other.answer());
            answer = format!("{answer}\n\n{extra}");
            suggestions = self.merged_suggestions(&kb, entry, other);
            kind = MatchKind::Fused;
        }

        let topic = entry.topic_key().map(str::to_string);
        if self.config.memory_enabled {
            if let Some(key) = topic.as_deref() {
                if self.memory.recall(key) {
                    debug!(topic = key, "Topic already discussed");
                    answer = format!("{MEMORY_PREFIX}{answer}");
                }
            }
        }

        debug!(
            index = best.index,
            base = best.score.base,
            total = best.score.total,
            candidates = candidates.len(),
            ?kind,
            "Selected answer"
        );
        MatchResult {
            answer,
            suggestions,
            kind,
            topic,
        }
    }

    /// The runner-up, when it qualifies for fusion with `best`.
    fn fusion_partner(
        &self,
        kb: &KnowledgeBase,
        best: Candidate,
        second: Option<Candidate>,
    ) -> Option<Candidate> {
        let second = second?;
        if second.index == best.index {
            return None;
        }
        let (a, b) = (&kb.entries()[best.index], &kb.entries()[second.index]);
        if !a.is_topical() || !b.is_topical() {
            return None;
        }
        let ratio = f64::from(second.score.total) / f64::from(best.score.total);
        (ratio >= self.config.fusion_ratio).then_some(second)
    }

    fn suggestions_for(&self, kb: &KnowledgeBase, entry: &KnowledgeEntry) -> Vec<String> {
        if entry.suggestions().is_empty() {
            kb.fallback().suggestions.clone()
        } else {
            entry.suggestions().to_vec()
        }
    }

    fn merged_suggestions(
        &self,
        kb: &KnowledgeBase,
        first: &KnowledgeEntry,
        second: &KnowledgeEntry,
    ) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for s in first.suggestions().iter().chain(second.suggestions()) {
            if merged.len() >= self.config.max_suggestions {
                break;
            }
            if !merged.contains(s) {
                merged.push(s.clone());
            }
        }
        if merged.is_empty() {
            kb.fallback().suggestions.clone()
        } else {
            merged
        }
    }

    fn resolve(&mut self, index: usize, answer: &Answer) -> String {
        match answer {
            Answer::Static(text) => text.clone(),
            Answer::RotatingPool { items, suffix } => {
                let item = self.rotate(Rotation::Entry(index), items);
                match suffix {
                    Some(suffix) => format!("{item}{suffix}"),
                    None => item,
                }
            }
            Answer::RandomPick { items } => items.choose(&mut self.rng).cloned().unwrap_or_default(),
        }
    }

    fn rotate(&mut self, key: Rotation, pool: &[String]) -> String {
        if pool.is_empty() {
            return String::new();
        }
        let cursor = self.cursors.entry(key).or_insert(0);
        let item = pool[*cursor % pool.len()].clone();
        *cursor += 1;
        item
    }

    fn fallback(&mut self, kb: &KnowledgeBase, tokens: &[String]) -> MatchResult {
        let fallback = kb.fallback();
        let on_domain = !fallback.domain_answers.is_empty()
            && tokens.iter().any(|t| fallback.domain_terms.contains(t));

        let answer = if on_domain {
            self.rotate(Rotation::DomainFallback, &fallback.domain_answers)
        } else {
            self.rotate(Rotation::Fallback, &fallback.answers)
        };
        MatchResult {
            answer,
            suggestions: fallback.suggestions.clone(),
            kind: MatchKind::Fallback,
            topic: None,
        }
    }

    fn prefiltered(&mut self, kb: &KnowledgeBase, kind: PrefilterKind) -> MatchResult {
        let pool = kb.prefilter().responses(kind);
        let answer = if pool.is_empty() {
            self.rotate(Rotation::Fallback, &kb.fallback().answers)
        } else {
            self.rotate(Rotation::Prefilter(kind), pool)
        };
        MatchResult {
            answer,
            suggestions: kb.fallback().suggestions.clone(),
            kind: MatchKind::Prefiltered(kind),
            topic: None,
        }
    }
}

impl std::fmt::Debug for KeywordMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordMatcher")
            .field("entries", &self.kb.len())
            .field("config", &self.config)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Fallback;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::new(vec![
            KnowledgeEntry::conversational(&["hello", "hi"], "Hey there!", 100),
            KnowledgeEntry::topical(&["skill", "tools"], "Python and SQL.")
                .with_suggestions(&["Projects?"]),
            KnowledgeEntry::topical(&["ml"], "Models."),
            KnowledgeEntry::conversational(
                &["joke"],
                Answer::RotatingPool {
                    items: vec!["one".to_string(), "two".to_string()],
                    suffix: Some(" (more?)".to_string()),
                },
                90,
            ),
        ])
        .with_fallback(Fallback {
            answers: vec!["fallback A".to_string(), "fallback B".to_string()],
            suggestions: vec!["Try skills".to_string()],
            domain_terms: vec!["statistics".to_string()],
            domain_answers: vec!["domain fallback".to_string()],
        })
    }

    #[test]
    fn test_two_letter_keyword_answers() {
        let mut matcher = KeywordMatcher::new(kb());
        let result = matcher.find_answer("ml");
        assert_eq!(result.answer, "Models.");
        assert_eq!(result.kind, MatchKind::Matched);
    }

    #[test]
    fn test_entry_without_suggestions_uses_fallback_list() {
        let mut matcher = KeywordMatcher::new(kb());
        assert_eq!(matcher.find_answer("ml").suggestions, vec!["Try skills"]);
        assert_eq!(matcher.find_answer("skills").suggestions, vec!["Projects?"]);
    }

    #[test]
    fn test_threshold_sends_weak_topical_match_to_fallback() {
        let config = MatcherConfig::new().with_min_topical_score(3);
        let mut matcher = KeywordMatcher::new(kb()).with_config(config);
        assert_eq!(matcher.find_answer("ml").kind, MatchKind::Fallback);
    }

    #[test]
    fn test_fallback_rotates_and_domain_pool() {
        let mut matcher = KeywordMatcher::new(kb());
        assert_eq!(matcher.find_answer("quantum physics").answer, "fallback A");
        assert_eq!(matcher.find_answer("quantum physics").answer, "fallback B");
        assert_eq!(matcher.find_answer("quantum physics").answer, "fallback A");
        assert_eq!(matcher.find_answer("statistics").answer, "domain fallback");
    }

    #[test]
    fn test_rotating_pool_with_suffix() {
        let mut matcher = KeywordMatcher::new(kb());
        assert_eq!(matcher.find_answer("joke").answer, "one (more?)");
        assert_eq!(matcher.find_answer("joke").answer, "two (more?)");
        assert_eq!(matcher.find_answer("joke").answer, "one (more?)");
    }

    #[test]
    fn test_conversational_is_not_remembered() {
        let mut matcher = KeywordMatcher::new(kb());
        matcher.find_answer("hello");
        let again = matcher.find_answer("hello");
        assert_eq!(again.answer, "Hey there!");
        assert!(matcher.memory().is_empty());
    }

    #[test]
    fn test_memory_disabled() {
        let mut matcher = KeywordMatcher::new(kb()).with_config(MatcherConfig::new().with_memory(false));
        matcher.find_answer("skills");
        assert!(!matcher.find_answer("skills").answer.starts_with(MEMORY_PREFIX));
    }

    #[test]
    fn test_reset_memory() {
        let mut matcher = KeywordMatcher::new(kb());
        matcher.find_answer("skills");
        matcher.reset_memory();
        assert_eq!(matcher.find_answer("skills").answer, "Python and SQL.");
    }

    #[test]
    fn test_empty_knowledge_base_never_panics() {
        let mut matcher = KeywordMatcher::new(KnowledgeBase::new(Vec::new()));
        let result = matcher.find_answer("anything at all");
        assert_eq!(result.kind, MatchKind::Fallback);
        assert!(!result.answer.is_empty());
    }

    #[test]
    fn test_result_serializes_kind() {
        let mut matcher = KeywordMatcher::new(kb());
        let json = serde_json::to_value(matcher.find_answer("skills")).unwrap();
        assert_eq!(json["kind"], "matched");
        assert_eq!(json["topic"], "skill");
    }
}
