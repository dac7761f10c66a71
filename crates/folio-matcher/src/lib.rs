//! Rule-based question answering over a portfolio knowledge base.
//!
//! ```text
//! input ──▶ pre-filter ──▶ normalize ──▶ synonyms ──▶ score/rank
//!              │                                         │
//!              ▼                                         ▼
//!         canned reply                  fallback ◀── select ──▶ fuse
//!                                                        │
//!                                                        ▼
//!                                              resolve + memory prefix
//! ```
//!
//! [`KeywordMatcher::find_answer`] always produces a [`MatchResult`]; the only
//! fallible step is loading a [`KnowledgeBase`].

mod error;
mod knowledge;
mod matcher;
mod memory;
mod prefilter;
mod scoring;
mod synonyms;
mod text;

pub use error::{MatcherError, Result};
pub use knowledge::{Answer, Fallback, Greeting, Keyword, KnowledgeBase, KnowledgeEntry};
pub use matcher::{KeywordMatcher, MEMORY_PREFIX, MatchKind, MatchResult, MatcherConfig};
pub use memory::ConversationMemory;
pub use prefilter::{PrefilterKind, PrefilterResponses, PrefilterRules};
pub use scoring::{Candidate, Score, rank, score_entry};
pub use synonyms::{Synonym, SynonymMap};
pub use text::{FuzzyConfig, fuzzy_match, levenshtein, normalize};
