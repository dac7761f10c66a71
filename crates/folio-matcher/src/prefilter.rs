//! Cheap checks that run before scoring.
//!
//! Noise, insults, bare acknowledgements and clearly off-topic questions get
//! a canned reply without touching the knowledge base entries.

use serde::{Deserialize, Serialize};

use crate::text::normalize;

const VOWELS: [char; 6] = ['a', 'e', 'i', 'o', 'u', 'y'];

/// Minimum length of a vowel-less token treated as keyboard mash.
const MASH_MIN_LEN: usize = 6;

/// Minimum length of a single repeated character treated as noise.
const REPEAT_MIN_LEN: usize = 4;

/// Why an input was answered by the pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefilterKind {
    Gibberish,
    Acknowledgement,
    Insult,
    OffTopic,
}

/// Canned replies per pre-filter outcome. Each pool rotates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefilterResponses {
    #[serde(default)]
    pub gibberish: Vec<String>,
    #[serde(default)]
    pub insult: Vec<String>,
    #[serde(default)]
    pub off_topic: Vec<String>,
    #[serde(default)]
    pub acknowledgement: Vec<String>,
}

/// Word lists and replies for the pre-filter.
///
/// Lists hold whole normalized tokens; there is no fuzzy matching here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefilterRules {
    #[serde(default)]
    pub insults: Vec<String>,
    #[serde(default)]
    pub off_topic: Vec<String>,
    #[serde(default)]
    pub acknowledgements: Vec<String>,
    #[serde(default)]
    pub responses: PrefilterResponses,
}

impl PrefilterRules {
    /// Classify raw user input. `None` means it goes on to scoring.
    pub fn classify(&self, input: &str) -> Option<PrefilterKind> {
        if !input.chars().any(char::is_alphanumeric) {
            return Some(PrefilterKind::Gibberish);
        }

        let tokens = normalize(input);
        if let [only] = tokens.as_slice() {
            if is_mash(only) {
                return Some(PrefilterKind::Gibberish);
            }
        }

        let listed = |list: &[String], token: &String| list.iter().any(|w| w == token);

        if !self.acknowledgements.is_empty()
            && tokens.iter().all(|t| listed(&self.acknowledgements, t))
        {
            return Some(PrefilterKind::Acknowledgement);
        }
        if tokens.iter().any(|t| listed(&self.insults, t)) {
            return Some(PrefilterKind::Insult);
        }
        if tokens.iter().any(|t| listed(&self.off_topic, t)) {
            return Some(PrefilterKind::OffTopic);
        }
        None
    }

    /// Reply pool for `kind`. May be empty, in which case the caller falls
    /// back to its generic replies.
    pub fn responses(&self, kind: PrefilterKind) -> &[String] {
        match kind {
            PrefilterKind::Gibberish => &self.responses.gibberish,
            PrefilterKind::Acknowledgement => &self.responses.acknowledgement,
            PrefilterKind::Insult => &self.responses.insult,
            PrefilterKind::OffTopic => &self.responses.off_topic,
        }
    }

    /// A word list without replies would answer with generic fallback text,
    /// which is never what the author meant.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let pairs = [
            ("insults", &self.insults, &self.responses.insult),
            ("off_topic", &self.off_topic, &self.responses.off_topic),
            (
                "acknowledgements",
                &self.acknowledgements,
                &self.responses.acknowledgement,
            ),
        ];
        for (name, words, replies) in pairs {
            if !words.is_empty() && replies.is_empty() {
                return Err(format!("prefilter list '{name}' has no responses"));
            }
        }
        let pools = [
            ("gibberish", &self.responses.gibberish),
            ("insult", &self.responses.insult),
            ("off_topic", &self.responses.off_topic),
            ("acknowledgement", &self.responses.acknowledgement),
        ];
        for (name, replies) in pools {
            if replies.iter().any(|r| r.trim().is_empty()) {
                return Err(format!("prefilter response pool '{name}' has an empty reply"));
            }
        }
        Ok(())
    }
}

fn is_mash(token: &str) -> bool {
    if !token.chars().all(char::is_alphabetic) {
        return false;
    }
    let len = token.chars().count();
    let mut chars = token.chars();
    let first = chars.next();
    let repeated = first.is_some_and(|c| chars.all(|x| x == c));

    (repeated && len >= REPEAT_MIN_LEN)
        || (len >= MASH_MIN_LEN && !token.chars().any(|c| VOWELS.contains(&c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PrefilterRules {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        PrefilterRules {
            insults: words(&["stupid", "dumb"]),
            off_topic: words(&["bitcoin", "recipe"]),
            acknowledgements: words(&["ok", "yes", "no"]),
            responses: PrefilterResponses {
                gibberish: words(&["huh?"]),
                insult: words(&["ouch"]),
                off_topic: words(&["not my lane"]),
                acknowledgement: words(&["got it"]),
            },
        }
    }

    #[test]
    fn test_noise_is_gibberish() {
        let rules = rules();
        assert_eq!(rules.classify(""), Some(PrefilterKind::Gibberish));
        assert_eq!(rules.classify("   "), Some(PrefilterKind::Gibberish));
        assert_eq!(rules.classify("?!?!"), Some(PrefilterKind::Gibberish));
        assert_eq!(rules.classify("sdfghjkl"), Some(PrefilterKind::Gibberish));
        assert_eq!(rules.classify("aaaaaa"), Some(PrefilterKind::Gibberish));
    }

    #[test]
    fn test_real_words_pass() {
        let rules = rules();
        assert_eq!(rules.classify("What are her skills?"), None);
        assert_eq!(rules.classify("rhythms"), None);
        assert_eq!(rules.classify("sql"), None);
    }

    #[test]
    fn test_word_lists() {
        let rules = rules();
        assert_eq!(rules.classify("ok"), Some(PrefilterKind::Acknowledgement));
        assert_eq!(rules.classify("Yes!"), Some(PrefilterKind::Acknowledgement));
        assert_eq!(rules.classify("yes, python"), None);
        assert_eq!(rules.classify("you are stupid"), Some(PrefilterKind::Insult));
        assert_eq!(
            rules.classify("should I buy bitcoin"),
            Some(PrefilterKind::OffTopic)
        );
    }

    #[test]
    fn test_validate_requires_replies_for_lists() {
        let mut rules = rules();
        assert!(rules.validate().is_ok());
        rules.responses.insult.clear();
        assert!(rules.validate().is_err());
        assert!(PrefilterRules::default().validate().is_ok());
    }
}
