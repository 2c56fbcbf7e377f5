// Query term extraction
//
// *La Question* (The Question) - Turn a free-text request into matchable terms

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]+[a-z]*|[a-z]+|[0-9]+").expect("word pattern is valid"));

/// Words that carry no signal for locating files.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "onto", "that", "this", "these", "those", "are",
    "was", "were", "been", "have", "has", "had", "does", "did", "will", "would", "could",
    "should", "may", "might", "must", "can", "need", "needs", "show", "tell", "explain",
    "describe", "how", "what", "where", "when", "why", "which", "all", "any", "some", "our",
    "add", "adding", "update", "change", "fix", "make", "implement", "create", "remove", "new",
    "use", "using", "support", "please", "also", "then", "via",
];

/// Lowercase word tokens of `text`, splitting camelCase and punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

/// Strip a common English suffix, keeping at least three characters.
pub fn stem(word: &str) -> &str {
    for suffix in ["ing", "ers", "er", "es", "ed", "s"] {
        if let Some(stripped) = word.strip_suffix(suffix) {
            if stripped.len() >= 3 {
                return stripped;
            }
        }
    }
    word
}

/// True if two stems name the same concept (one is a prefix of the other).
pub fn stems_match(a: &str, b: &str) -> bool {
    a.len() >= 3 && b.len() >= 3 && (a.starts_with(b) || b.starts_with(a))
}

/// Distinct stemmed query terms in first-seen order.
///
/// Falls back to every token of three or more characters when all words
/// are stop words.
pub fn extract_terms(query: &str) -> Vec<String> {
    let tokens = tokenize(query);
    let mut seen = HashSet::new();
    let mut terms: Vec<String> = tokens
        .iter()
        .filter(|t| t.len() >= 3 && !STOP_WORDS.contains(&t.as_str()))
        .map(|t| stem(t).to_string())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if terms.is_empty() {
        terms = tokens
            .iter()
            .filter(|t| t.len() >= 3)
            .map(|t| stem(t).to_string())
            .filter(|t| seen.insert(t.clone()))
            .collect();
    }
    terms
}
