//! Knowledge base model and loading.
//!
//! A knowledge base is a list of entries plus the synonym table, fallback
//! responses and pre-filter word lists the matcher needs. The built-in one
//! ships inside the crate as TOML; a replacement can be loaded from a TOML or
//! JSON file of the same shape.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MatcherError, Result};
use crate::prefilter::PrefilterRules;
use crate::synonyms::{Synonym, SynonymMap};
use crate::text::phrase_words;

const BUILTIN_KNOWLEDGE: &str = include_str!("../data/knowledge.toml");

// ─────────────────────────────────────────────────────────────────────────────
// Answers
// ─────────────────────────────────────────────────────────────────────────────

/// What an entry says when it wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// Fixed text.
    Static(String),

    /// Cycles through `items` in order, one per answer. `suffix` is appended
    /// after the chosen item.
    RotatingPool {
        items: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<String>,
    },

    /// A uniformly random item per answer.
    RandomPick { items: Vec<String> },
}

impl Answer {
    fn validate(&self) -> std::result::Result<(), String> {
        let items: &[String] = match self {
            Answer::Static(text) => std::slice::from_ref(text),
            Answer::RotatingPool { items, .. } | Answer::RandomPick { items } => items,
        };
        if items.is_empty() {
            return Err("answer pool is empty".to_string());
        }
        if items.iter().any(|t| t.trim().is_empty()) {
            return Err("answer text is empty".to_string());
        }
        Ok(())
    }
}

impl From<&str> for Answer {
    fn from(text: &str) -> Self {
        Answer::Static(text.to_string())
    }
}

impl From<String> for Answer {
    fn from(text: String) -> Self {
        Answer::Static(text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────────────────────────────────────

/// A keyword phrase with its normalized words.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    phrase: String,
    words: Vec<String>,
}

impl Keyword {
    pub fn new(phrase: impl Into<String>) -> Self {
        let phrase = phrase.into().trim().to_lowercase();
        let words = phrase_words(&phrase);
        Self { phrase, words }
    }

    /// The phrase as written in the knowledge base, lower-cased.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Normalized words of the phrase.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// More than one word: all of them must be present to score.
    pub fn is_phrase(&self) -> bool {
        self.words.len() > 1
    }

    /// Character length of the phrase; the base of its score.
    pub fn len(&self) -> usize {
        self.phrase.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// One knowledge base entry.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeEntry {
    /// Informational content about the portfolio owner. Remembered by topic
    /// and eligible for fusion with another topical entry.
    Topical {
        keywords: Vec<Keyword>,
        answer: Answer,
        suggestions: Vec<String>,
    },

    /// Greetings, small talk and easter eggs. `priority` is added to the
    /// score when any keyword matched; never fused, never remembered.
    Conversational {
        keywords: Vec<Keyword>,
        answer: Answer,
        suggestions: Vec<String>,
        priority: u32,
    },
}

impl KnowledgeEntry {
    pub fn topical(keywords: &[&str], answer: impl Into<Answer>) -> Self {
        KnowledgeEntry::Topical {
            keywords: keywords.iter().map(|k| Keyword::new(*k)).collect(),
            answer: answer.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn conversational(keywords: &[&str], answer: impl Into<Answer>, priority: u32) -> Self {
        KnowledgeEntry::Conversational {
            keywords: keywords.iter().map(|k| Keyword::new(*k)).collect(),
            answer: answer.into(),
            suggestions: Vec::new(),
            priority,
        }
    }

    pub fn with_suggestions(mut self, list: &[&str]) -> Self {
        let list = list.iter().map(|s| s.to_string()).collect();
        match &mut self {
            KnowledgeEntry::Topical { suggestions, .. }
            | KnowledgeEntry::Conversational { suggestions, .. } => *suggestions = list,
        }
        self
    }

    pub fn keywords(&self) -> &[Keyword] {
        match self {
            KnowledgeEntry::Topical { keywords, .. }
            | KnowledgeEntry::Conversational { keywords, .. } => keywords,
        }
    }

    pub fn answer(&self) -> &Answer {
        match self {
            KnowledgeEntry::Topical { answer, .. }
            | KnowledgeEntry::Conversational { answer, .. } => answer,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            KnowledgeEntry::Topical { suggestions, .. }
            | KnowledgeEntry::Conversational { suggestions, .. } => suggestions,
        }
    }

    /// Score boost; zero for topical entries.
    pub fn priority(&self) -> u32 {
        match self {
            KnowledgeEntry::Topical { .. } => 0,
            KnowledgeEntry::Conversational { priority, .. } => *priority,
        }
    }

    pub fn is_topical(&self) -> bool {
        matches!(self, KnowledgeEntry::Topical { .. })
    }

    /// Memory key: the first keyword of a topical entry.
    pub fn topic_key(&self) -> Option<&str> {
        match self {
            KnowledgeEntry::Topical { keywords, .. } => keywords.first().map(Keyword::phrase),
            KnowledgeEntry::Conversational { .. } => None,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.keywords().is_empty() {
            return Err("entry has no keywords".to_string());
        }
        if let Some(k) = self.keywords().iter().find(|k| k.is_empty()) {
            return Err(format!("keyword '{}' has no words", k.phrase()));
        }
        if let KnowledgeEntry::Conversational { priority: 0, .. } = self {
            return Err("priority must be greater than zero".to_string());
        }
        self.answer().validate()
    }
}

/// Entry as written in a knowledge base file.
#[derive(Debug, Deserialize)]
struct EntryRecord {
    keywords: Vec<String>,
    answer: Answer,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    priority: Option<u32>,
}

impl TryFrom<EntryRecord> for KnowledgeEntry {
    type Error = String;

    fn try_from(record: EntryRecord) -> std::result::Result<Self, String> {
        let keywords = record.keywords.into_iter().map(Keyword::new).collect();
        let entry = match record.priority {
            Some(priority) => KnowledgeEntry::Conversational {
                keywords,
                answer: record.answer,
                suggestions: record.suggestions,
                priority,
            },
            None => KnowledgeEntry::Topical {
                keywords,
                answer: record.answer,
                suggestions: record.suggestions,
            },
        };
        entry.validate()?;
        Ok(entry)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fallback & Greeting
// ─────────────────────────────────────────────────────────────────────────────

/// Responses used when nothing matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fallback {
    /// Rotating generic responses.
    pub answers: Vec<String>,

    /// Suggestions for fallback results and entries without their own.
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Subject words that switch to `domain_answers`.
    #[serde(default)]
    pub domain_terms: Vec<String>,

    /// Rotating responses for unmatched questions about the subject area.
    #[serde(default)]
    pub domain_answers: Vec<String>,
}

impl Fallback {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.answers.is_empty() {
            return Err("fallback needs at least one answer".to_string());
        }
        if self.answers.iter().any(|a| a.trim().is_empty()) {
            return Err("fallback answer is empty".to_string());
        }
        if self.domain_answers.iter().any(|a| a.trim().is_empty()) {
            return Err("fallback domain answer is empty".to_string());
        }
        Ok(())
    }
}

impl Default for Fallback {
    fn default() -> Self {
        Self {
            answers: vec!["I'm not sure about that one. Try asking something else.".to_string()],
            suggestions: Vec::new(),
            domain_terms: Vec::new(),
            domain_answers: Vec::new(),
        }
    }
}

/// Opening message shown when a chat starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub text: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Default for Greeting {
    fn default() -> Self {
        Self {
            text: "Hi! Ask me anything about this portfolio.".to_string(),
            suggestions: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Base
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct KnowledgeFile {
    #[serde(default)]
    greeting: Option<Greeting>,
    #[serde(default, rename = "entry")]
    entries: Vec<EntryRecord>,
    #[serde(default, rename = "synonym")]
    synonyms: Vec<Synonym>,
    #[serde(default)]
    fallback: Option<Fallback>,
    #[serde(default)]
    prefilter: Option<PrefilterRules>,
}

/// Everything the keyword matcher answers from. Immutable once built.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
    synonyms: SynonymMap,
    fallback: Fallback,
    prefilter: PrefilterRules,
    greeting: Greeting,
}

impl KnowledgeBase {
    /// A knowledge base with just `entries` and default everything else.
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries,
            synonyms: SynonymMap::default(),
            fallback: Fallback::default(),
            prefilter: PrefilterRules::default(),
            greeting: Greeting::default(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: Vec<Synonym>) -> Self {
        self.synonyms = SynonymMap::new(synonyms);
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_prefilter(mut self, prefilter: PrefilterRules) -> Self {
        self.prefilter = prefilter;
        self
    }

    pub fn with_greeting(mut self, greeting: Greeting) -> Self {
        self.greeting = greeting;
        self
    }

    /// The knowledge base compiled into the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_KNOWLEDGE)
    }

    /// Parse a TOML knowledge base.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: KnowledgeFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    /// Parse a JSON knowledge base (same shape as the TOML form).
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: KnowledgeFile = serde_json::from_str(content)?;
        Self::from_file(file)
    }

    /// Load from disk; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MatcherError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let kb = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        debug!(path = %path.display(), entries = kb.len(), "Loaded knowledge base");
        Ok(kb)
    }

    fn from_file(file: KnowledgeFile) -> Result<Self> {
        let entries = file
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                KnowledgeEntry::try_from(record)
                    .map_err(|reason| MatcherError::InvalidEntry { index, reason })
            })
            .collect::<Result<Vec<_>>>()?;
        if entries.is_empty() {
            return Err(MatcherError::Invalid("knowledge base has no entries".to_string()));
        }

        let fallback = file.fallback.unwrap_or_default();
        fallback.validate().map_err(MatcherError::Invalid)?;
        let prefilter = file.prefilter.unwrap_or_default();
        prefilter.validate().map_err(MatcherError::Invalid)?;

        Ok(Self {
            entries,
            synonyms: SynonymMap::new(file.synonyms),
            fallback,
            prefilter,
            greeting: file.greeting.unwrap_or_default(),
        })
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn synonyms(&self) -> &SynonymMap {
        &self.synonyms
    }

    pub fn fallback(&self) -> &Fallback {
        &self.fallback
    }

    pub fn prefilter(&self) -> &PrefilterRules {
        &self.prefilter
    }

    pub fn greeting(&self) -> &Greeting {
        &self.greeting
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loads() {
        let kb = KnowledgeBase::builtin().unwrap();

        assert!(kb.len() > 30);
        assert!(!kb.synonyms().is_empty());
        assert_eq!(kb.fallback().answers.len(), 3);
        assert_eq!(kb.greeting().suggestions.len(), 4);
        assert!(kb.entries().iter().any(|e| matches!(
            e.answer(),
            Answer::RotatingPool { suffix: Some(_), .. }
        )));
        assert!(
            kb.entries()
                .iter()
                .any(|e| matches!(e.answer(), Answer::RandomPick { .. }))
        );
    }

    #[test]
    fn test_builtin_text_has_no_markup_or_em_dashes() {
        let kb = KnowledgeBase::builtin().unwrap();
        for entry in kb.entries() {
            if let Answer::Static(text) = entry.answer() {
                assert!(!text.contains('<'), "markup in {:?}", entry.topic_key());
                assert!(!text.contains('\u{2014}'));
            }
        }
    }

    #[test]
    fn test_keywords_are_normalized() {
        let kw = Keyword::new("What's Up");
        assert_eq!(kw.phrase(), "what's up");
        assert_eq!(kw.words(), ["whats", "up"]);
        assert!(kw.is_phrase());
        assert_eq!(kw.len(), 9);

        assert!(Keyword::new("2+2").is_phrase());
        assert!(!Keyword::new("python").is_phrase());
    }

    #[test]
    fn test_topic_key_is_first_keyword() {
        let entry = KnowledgeEntry::topical(&["skill", "tools"], "Python, SQL");
        assert_eq!(entry.topic_key(), Some("skill"));

        let greeting = KnowledgeEntry::conversational(&["hello"], "Hi!", 100);
        assert_eq!(greeting.topic_key(), None);
        assert_eq!(greeting.priority(), 100);
    }

    #[test]
    fn test_priority_marks_conversational() {
        let kb = KnowledgeBase::from_toml_str(
            r#"
            [[entry]]
            keywords = ["hello"]
            priority = 100
            answer = { static = "Hi!" }

            [[entry]]
            keywords = ["python"]
            answer = { static = "Python." }
            "#,
        )
        .unwrap();

        assert!(!kb.entries()[0].is_topical());
        assert!(kb.entries()[1].is_topical());
    }

    #[test]
    fn test_json_knowledge_base() {
        let kb = KnowledgeBase::from_json_str(
            r#"{
                "entry": [
                    {"keywords": ["joke"], "priority": 90,
                     "answer": {"rotating_pool": {"items": ["a", "b"], "suffix": "!"}}}
                ],
                "fallback": {"answers": ["Nope."]}
            }"#,
        )
        .unwrap();

        assert_eq!(kb.len(), 1);
        assert_eq!(kb.fallback().answers, vec!["Nope."]);
    }

    #[test]
    fn test_validation_errors() {
        let no_keywords = r#"
            [[entry]]
            keywords = []
            answer = { static = "x" }
        "#;
        assert!(matches!(
            KnowledgeBase::from_toml_str(no_keywords),
            Err(MatcherError::InvalidEntry { index: 0, .. })
        ));

        let empty_pool = r#"
            [[entry]]
            keywords = ["a"]
            answer = { static = "x" }

            [[entry]]
            keywords = ["b"]
            answer = { random_pick = { items = [] } }
        "#;
        assert!(matches!(
            KnowledgeBase::from_toml_str(empty_pool),
            Err(MatcherError::InvalidEntry { index: 1, .. })
        ));

        let zero_priority = r#"
            [[entry]]
            keywords = ["a"]
            priority = 0
            answer = { static = "x" }
        "#;
        assert!(KnowledgeBase::from_toml_str(zero_priority).is_err());

        assert!(matches!(
            KnowledgeBase::from_toml_str(""),
            Err(MatcherError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.toml");
        std::fs::write(
            &path,
            "[[entry]]\nkeywords = [\"sql\"]\nanswer = { static = \"SQL.\" }\n",
        )
        .unwrap();

        let kb = KnowledgeBase::load(&path).unwrap();
        assert_eq!(kb.len(), 1);

        let missing = KnowledgeBase::load(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(MatcherError::ReadFile { .. })));
    }
}
