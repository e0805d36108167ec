//! Query text handling: normalization, negative keyword filtering and the
//! commercial-intent signal used to size the competitor field.

use std::collections::HashSet;

/// Lowercase, punctuation to spaces, collapse whitespace
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn word_set(text: &str) -> HashSet<String> {
    normalize(text).split(' ').filter(|w| !w.is_empty()).map(|w| w.to_string()).collect()
}

/// Negative keyword in one of its three syntaxes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegativeKeyword {
    /// `"running shoes"`: blocks queries containing the phrase
    Phrase(String),
    /// `[running shoes]`: blocks only that exact query
    Exact(String),
    /// `free`: blocks queries containing all of the words, any order
    Broad(HashSet<String>),
}

impl NegativeKeyword {
    /// None for blank entries
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let negative = if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            NegativeKeyword::Phrase(normalize(raw.trim_matches('"')))
        } else if raw.starts_with('[') && raw.ends_with(']') {
            NegativeKeyword::Exact(normalize(raw.trim_start_matches('[').trim_end_matches(']')))
        } else {
            NegativeKeyword::Broad(word_set(raw))
        };
        match &negative {
            NegativeKeyword::Phrase(s) | NegativeKeyword::Exact(s) if s.is_empty() => None,
            NegativeKeyword::Broad(words) if words.is_empty() => None,
            _ => Some(negative),
        }
    }

    pub fn blocks(&self, query: &str) -> bool {
        let query = normalize(query);
        match self {
            NegativeKeyword::Phrase(phrase) => contains_phrase(&query, phrase),
            NegativeKeyword::Exact(exact) => query == *exact,
            NegativeKeyword::Broad(words) => {
                let query_words = word_set(&query);
                words.is_subset(&query_words)
            }
        }
    }
}

/// Phrase containment on word boundaries
fn contains_phrase(query: &str, phrase: &str) -> bool {
    let padded_query = format!(" {} ", query);
    let padded_phrase = format!(" {} ", phrase);
    padded_query.contains(&padded_phrase)
}

/// Parsed negative list, built once at setup
#[derive(Debug, Clone, Default)]
pub struct NegativeKeywords {
    negatives: Vec<NegativeKeyword>,
}

impl NegativeKeywords {
    pub fn parse<'a>(raw: impl IntoIterator<Item = &'a String>) -> Self {
        Self { negatives: raw.into_iter().filter_map(|r| NegativeKeyword::parse(r)).collect() }
    }

    pub fn is_hit(&self, query: &str) -> bool {
        self.negatives.iter().any(|n| n.blocks(query))
    }
}

const INTENT_TERMS: &[(&str, f64)] = &[
    ("buy", 0.9),
    ("purchase", 0.85),
    ("order", 0.85),
    ("price", 0.8),
    ("shop", 0.8),
    ("cheap", 0.75),
    ("deal", 0.75),
    ("sale", 0.75),
    ("best", 0.7),
    ("discount", 0.7),
    ("review", 0.65),
    ("compare", 0.6),
    ("where", 0.35),
    ("how", 0.3),
    ("what", 0.25),
    ("why", 0.2),
];

const DEFAULT_INTENT: f64 = 0.4;

/// Commercial intent of a query, the strongest signal among its words
pub fn intent_score(query: &str) -> f64 {
    let words = word_set(query);
    INTENT_TERMS
        .iter()
        .filter(|(term, _)| words.contains(*term))
        .map(|(_, score)| *score)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
        .unwrap_or(DEFAULT_INTENT)
}

/// Longer queries are more specific and attract more advertisers
pub fn query_complexity(query: &str) -> f64 {
    let words = normalize(query).split(' ').filter(|w| !w.is_empty()).count();
    (0.5 + 0.1 * words as f64).min(1.0)
}
