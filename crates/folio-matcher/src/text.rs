//! Text normalization and typo-tolerant word matching.

/// Apostrophe variants removed outright, so "what's" becomes "whats".
const APOSTROPHES: [char; 4] = ['\'', '\u{2019}', '\u{2018}', '`'];

/// Lower-case `text` and split it into word tokens.
///
/// Apostrophes are dropped without leaving a gap; every other punctuation
/// character becomes a separator. Empty tokens never appear in the output.
pub fn normalize(text: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        if APOSTROPHES.contains(&ch) {
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' {
            cleaned.push(ch);
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Normalize a keyword phrase into its words, as `normalize` would split
/// the same text typed by a user.
pub fn phrase_words(phrase: &str) -> Vec<String> {
    normalize(phrase)
}

/// Edit distance (insertions, deletions, substitutions) between two strings,
/// counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single rolling row.
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

// ─────────────────────────────────────────────────────────────────────────────
// Fuzzy Matching
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerances for [`FuzzyConfig::matches`].
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyConfig {
    /// Words or keywords this short (in chars) only match exactly.
    pub short_word_len: usize,

    /// A substring match needs the shorter side to cover this share of the
    /// longer one.
    pub substring_ratio: f64,

    /// Words up to this length get the tighter typo budget.
    pub short_typo_len: usize,

    /// Edit distance allowed for short words.
    pub short_typo_distance: usize,

    /// Edit distance allowed for longer words.
    pub long_typo_distance: usize,

    /// Input tokens shorter than this never trigger synonym expansion.
    pub synonym_min_len: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            short_word_len: 3,
            substring_ratio: 0.5,
            short_typo_len: 4,
            short_typo_distance: 1,
            long_typo_distance: 2,
            synonym_min_len: 3,
        }
    }
}

impl FuzzyConfig {
    /// Whether the user's `word` should count as `keyword`.
    ///
    /// Exact matches always count. Below that, short words never match
    /// loosely ("her" must not become "hey"). Substrings count when they are
    /// long enough relative to the other side, and anything else falls back
    /// to a length-dependent edit distance.
    pub fn matches(&self, word: &str, keyword: &str) -> bool {
        if word == keyword {
            return true;
        }

        let word_len = word.chars().count();
        let keyword_len = keyword.chars().count();
        if word_len <= self.short_word_len || keyword_len <= self.short_word_len {
            return false;
        }

        if keyword.contains(word) && word_len as f64 >= keyword_len as f64 * self.substring_ratio
        {
            return true;
        }
        if word.contains(keyword) && keyword_len as f64 >= word_len as f64 * self.substring_ratio
        {
            return true;
        }

        let budget = if word_len <= self.short_typo_len {
            self.short_typo_distance
        } else {
            self.long_typo_distance
        };
        levenshtein(word, keyword) <= budget
    }

    /// Whether any of `tokens` matches `keyword`.
    pub fn matches_any(&self, tokens: &[String], keyword: &str) -> bool {
        tokens.iter().any(|t| self.matches(t, keyword))
    }
}

/// [`FuzzyConfig::matches`] with default tolerances.
pub fn fuzzy_match(word: &str, keyword: &str) -> bool {
    FuzzyConfig::default().matches(word, keyword)
}
