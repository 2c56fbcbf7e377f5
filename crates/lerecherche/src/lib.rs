// lerecherche - Keyword Search
//
// *La Recherche* (The Search) - Path and symbol relevance ranking over a project inventory

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Keyword index and search.
pub mod index;
/// Query term extraction.
pub mod query;
/// Relevance scoring.
pub mod ranking;

pub use index::{IndexError, IndexedFile, KeywordIndex, SearchHit, SearchQuery, SearchResults};
pub use query::extract_terms;
pub use ranking::{FileTokens, RelevanceScorer, Score};

/// Search library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
