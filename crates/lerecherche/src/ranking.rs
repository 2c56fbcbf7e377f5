// Term-overlap relevance scoring

use crate::query::{stem, stems_match};
use serde::{Deserialize, Serialize};

/// Relevance broken down by where query terms matched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Score {
    /// Overall score (0-1)
    pub overall: f32,

    /// Fraction of terms matching the file name
    pub name: f32,

    /// Fraction of terms matching a directory segment
    pub directory: f32,

    /// Fraction of terms matching a declared symbol
    pub symbol: f32,
}

impl Score {
    /// Get the overall score
    pub fn value(&self) -> f32 {
        self.overall
    }
}

/// Tokens describing one indexed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileTokens {
    /// Stemmed file-name tokens
    pub name: Vec<String>,
    /// Stemmed directory tokens
    pub directory: Vec<String>,
    /// Stemmed symbol-name tokens
    pub symbols: Vec<String>,
}

impl FileTokens {
    /// Tokenize a project-relative path and its symbol names
    pub fn new<'a>(path: &str, symbols: impl IntoIterator<Item = &'a str>) -> Self {
        let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
        let stems = |text: &str| -> Vec<String> {
            crate::query::tokenize(text)
                .iter()
                .map(|t| stem(t).to_string())
                .collect()
        };
        Self {
            name: stems(name),
            directory: stems(dir),
            symbols: symbols.into_iter().flat_map(|s| stems(s)).collect(),
        }
    }
}

/// Weighted scorer over name, directory and symbol matches
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    name_weight: f32,
    directory_weight: f32,
    symbol_weight: f32,
}

impl RelevanceScorer {
    /// Create a scorer with default weights
    pub fn new() -> Self {
        Self {
            name_weight: 1.0,
            directory_weight: 0.6,
            symbol_weight: 0.8,
        }
    }

    /// Set custom weights
    pub fn with_weights(mut self, name: f32, directory: f32, symbol: f32) -> Self {
        self.name_weight = name;
        self.directory_weight = directory;
        self.symbol_weight = symbol;
        self
    }

    /// Score `tokens` against stemmed query `terms`, returning the terms
    /// that matched anywhere.
    ///
    /// Each term contributes its best-weighted match once; the total is
    /// divided by the term count.
    pub fn score(&self, terms: &[String], tokens: &FileTokens) -> (Score, Vec<String>) {
        if terms.is_empty() {
            return (Score::default(), Vec::new());
        }

        let hits = |set: &[String], term: &str| set.iter().any(|t| stems_match(t, term));
        let (mut name, mut directory, mut symbol, mut total) = (0usize, 0usize, 0usize, 0.0f32);
        let mut matched = Vec::new();

        for term in terms {
            let in_name = hits(&tokens.name, term);
            let in_dir = hits(&tokens.directory, term);
            let in_symbol = hits(&tokens.symbols, term);

            name += usize::from(in_name);
            directory += usize::from(in_dir);
            symbol += usize::from(in_symbol);

            let best = [
                (in_name, self.name_weight),
                (in_symbol, self.symbol_weight),
                (in_dir, self.directory_weight),
            ]
            .iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, weight)| *weight)
            .fold(0.0f32, f32::max);
            if best > 0.0 {
                matched.push(term.clone());
            }
            total += best;
        }

        let count = terms.len() as f32;
        let score = Score {
            overall: (total / count).clamp(0.0, 1.0),
            name: name as f32 / count,
            directory: directory as f32 / count,
            symbol: symbol as f32 / count,
        };
        (score, matched)
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new()
    }
}
