//! Keyword scoring and candidate ranking.

use crate::knowledge::KnowledgeEntry;
use crate::text::FuzzyConfig;

/// Score of one entry against one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    /// Keyword score alone.
    pub base: u32,

    /// `base` plus the entry priority, which only applies when `base > 0`.
    pub total: u32,
}

/// An entry that scored above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Position in the knowledge base.
    pub index: usize,
    pub score: Score,
}

/// Score `entry` against expanded input `tokens`.
///
/// A single-word keyword adds its length once when any token matches it. A
/// multi-word keyword adds twice its length when every one of its words
/// matches some token.
pub fn score_entry(entry: &KnowledgeEntry, tokens: &[String], fuzzy: &FuzzyConfig) -> Score {
    let mut base: u32 = 0;
    for keyword in entry.keywords() {
        let weight = u32::try_from(keyword.len()).unwrap_or(u32::MAX);
        let matched = keyword
            .words()
            .iter()
            .all(|word| fuzzy.matches_any(tokens, word));
        if !matched {
            continue;
        }
        let points = if keyword.is_phrase() {
            weight.saturating_mul(2)
        } else {
            weight
        };
        base = base.saturating_add(points);
    }

    let total = if base > 0 {
        base.saturating_add(entry.priority())
    } else {
        0
    };
    Score { base, total }
}

/// Score every entry, drop zeros, and sort by total descending.
///
/// The sort is stable, so ties keep knowledge base order.
pub fn rank(entries: &[KnowledgeEntry], tokens: &[String], fuzzy: &FuzzyConfig) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| Candidate {
            index,
            score: score_entry(entry, tokens, fuzzy),
        })
        .filter(|c| c.score.total > 0)
        .collect();
    candidates.sort_by(|a, b| b.score.total.cmp(&a.score.total));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    fn score(entry: &KnowledgeEntry, input: &str) -> Score {
        score_entry(entry, &normalize(input), &FuzzyConfig::default())
    }

    #[test]
    fn test_single_word_scores_its_length_once() {
        let entry = KnowledgeEntry::topical(&["python"], "Python.");
        assert_eq!(score(&entry, "python python"), Score { base: 6, total: 6 });
        assert_eq!(score(&entry, "pyton"), Score { base: 6, total: 6 });
    }

    #[test]
    fn test_phrase_needs_every_word_and_scores_double() {
        let entry = KnowledgeEntry::topical(&["machine learning"], "ML.");
        assert_eq!(score(&entry, "learning about machines").base, 32);
        assert_eq!(score(&entry, "machine").base, 0);
    }

    #[test]
    fn test_priority_only_with_a_match() {
        let entry = KnowledgeEntry::conversational(&["hello"], "Hi!", 100);
        assert_eq!(score(&entry, "hello"), Score { base: 5, total: 105 });
        assert_eq!(score(&entry, "goodbye"), Score { base: 0, total: 0 });
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let entries = vec![
            KnowledgeEntry::topical(&["sql"], "first"),
            KnowledgeEntry::topical(&["cv"], "none"),
            KnowledgeEntry::topical(&["api"], "third"),
        ];
        let ranked = rank(&entries, &normalize("api sql"), &FuzzyConfig::default());

        let order: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![0, 2]);
    }
}
