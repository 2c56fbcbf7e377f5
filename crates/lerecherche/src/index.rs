// Keyword index over a project's file inventory

use crate::query::extract_terms;
use crate::ranking::{FileTokens, RelevanceScorer, Score};
use leparse::languages::Language;
use leparse::parallel::ParallelScanner;
use leparse::scanner::SKIPPED_DIRECTORIES;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions of files worth indexing.
pub const INDEXED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rs", "go", "java", "kt", "rb", "php", "cs",
    "c", "h", "cpp", "hpp", "swift", "vue", "svelte", "css", "scss", "html", "sql", "graphql",
    "proto", "md", "rst", "txt", "toml", "yaml", "yml", "json", "ini", "cfg", "conf", "env",
    "example", "sh", "tf",
];

/// Extensionless file names worth indexing.
pub const INDEXED_NAMES: &[&str] = &["Dockerfile", "Makefile", "Procfile", "Jenkinsfile"];

/// Files larger than this are left out of the index.
pub const MAX_INDEXED_FILE_BYTES: u64 = 1024 * 1024;

/// Score multiplier applied to files found next to a primary hit.
pub const RELATED_DECAY: f32 = 0.5;

/// Index errors
#[derive(Debug, Error)]
pub enum IndexError {
    /// The project root does not exist or is not a directory
    #[error("project root not found: {0}")]
    RootNotFound(PathBuf),

    /// Directory walk error
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The query has no searchable terms
    #[error("empty query")]
    EmptyQuery,
}

/// One indexed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Project-relative, `/`-separated path
    pub path: String,
    /// Match tokens
    pub tokens: FileTokens,
}

/// Search query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text
    pub query: String,

    /// Maximum results per list
    pub top_k: usize,

    /// Whether to collect files next to the primary hits
    pub include_related: bool,
}

impl SearchQuery {
    /// Create a query returning at most `top_k` primary files
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
            include_related: true,
        }
    }
}

/// A matched file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Result rank (1-based within its list)
    pub rank: usize,
    /// Project-relative path
    pub file_path: String,
    /// Relevance score
    pub score: Score,
    /// Query terms that matched
    pub matched_terms: Vec<String>,
}

/// Primary and related hits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Files matching query terms, best first
    pub primary: Vec<SearchHit>,
    /// Files sharing a directory with a primary hit
    pub related: Vec<SearchHit>,
}

/// Keyword/path relevance index over a project.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    files: Vec<IndexedFile>,
    scorer: RelevanceScorer,
}

fn is_indexable(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if INDEXED_NAMES.contains(&name) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| INDEXED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl KeywordIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(path, symbol names)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<S>)>,
        S: AsRef<str>,
    {
        let files = entries
            .into_iter()
            .map(|(path, symbols)| IndexedFile {
                tokens: FileTokens::new(&path, symbols.iter().map(AsRef::as_ref)),
                path,
            })
            .collect();
        Self {
            files,
            scorer: RelevanceScorer::default(),
        }
    }

    /// Walk `root` and index every text file outside vendored directories.
    ///
    /// Source files in a supported language also contribute their symbol
    /// names. `max_depth` bounds directory descent.
    pub fn build(root: &Path, max_depth: Option<usize>) -> Result<Self, IndexError> {
        if !root.is_dir() {
            return Err(IndexError::RootNotFound(root.to_path_buf()));
        }

        let mut walker = WalkDir::new(root).follow_links(false);
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        let mut paths = Vec::new();
        let entries = walker.into_iter().filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || e.file_name()
                    .to_str()
                    .map_or(true, |name| !SKIPPED_DIRECTORIES.contains(&name))
        });
        for entry in entries {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_indexable(entry.path()) {
                continue;
            }
            if entry.metadata().map_or(true, |m| m.len() > MAX_INDEXED_FILE_BYTES) {
                continue;
            }
            paths.push(entry.into_path());
        }
        paths.sort();

        let sources: Vec<PathBuf> = paths
            .iter()
            .filter(|p| Language::from_path(p).is_some())
            .cloned()
            .collect();
        let mut symbols: HashMap<PathBuf, Vec<String>> = ParallelScanner::new()
            .scan_files(sources)
            .into_iter()
            .filter_map(|result| {
                let parsed = result.parsed?;
                let names = parsed.symbols.into_iter().map(|s| s.name).collect();
                Some((result.file_path, names))
            })
            .collect();

        let index = Self::from_entries(paths.into_iter().map(|path| {
            let names = symbols.remove(&path).unwrap_or_default();
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            (relative, names)
        }));

        tracing::info!("Indexed {} files under {}", index.len(), root.display());
        Ok(index)
    }

    /// Replace the scorer
    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Number of indexed files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Indexed paths
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    /// Rank files against `query`.
    ///
    /// Primary hits are files matching at least one term, ordered by score
    /// then path. Related hits share a directory with a primary hit and
    /// inherit a decayed copy of its best score.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults, IndexError> {
        let terms = extract_terms(&query.query);
        if terms.is_empty() {
            return Err(IndexError::EmptyQuery);
        }

        let mut primary: Vec<SearchHit> = self
            .files
            .iter()
            .filter_map(|file| {
                let (score, matched_terms) = self.scorer.score(&terms, &file.tokens);
                (score.overall > 0.0).then(|| SearchHit {
                    rank: 0,
                    file_path: file.path.clone(),
                    score,
                    matched_terms,
                })
            })
            .collect();
        sort_hits(&mut primary);
        primary.truncate(query.top_k);
        rank(&mut primary);

        let related = if query.include_related {
            self.related_to(&primary, query.top_k)
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Query {:?}: terms {:?}, {} primary, {} related",
            query.query,
            terms,
            primary.len(),
            related.len()
        );
        Ok(SearchResults { primary, related })
    }

    fn related_to(&self, primary: &[SearchHit], top_k: usize) -> Vec<SearchHit> {
        let taken: HashSet<&str> = primary.iter().map(|h| h.file_path.as_str()).collect();
        let mut best_by_dir: HashMap<&str, f32> = HashMap::new();
        for hit in primary {
            let dir = parent_dir(&hit.file_path);
            let entry = best_by_dir.entry(dir).or_insert(0.0);
            *entry = entry.max(hit.score.overall);
        }

        let mut related: Vec<SearchHit> = self
            .files
            .iter()
            .filter(|f| !taken.contains(f.path.as_str()))
            .filter_map(|f| {
                let best = best_by_dir.get(parent_dir(&f.path))?;
                Some(SearchHit {
                    rank: 0,
                    file_path: f.path.clone(),
                    score: Score {
                        overall: best * RELATED_DECAY,
                        ..Score::default()
                    },
                    matched_terms: Vec::new(),
                })
            })
            .collect();
        sort_hits(&mut related);
        related.truncate(top_k);
        rank(&mut related);
        related
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .overall
            .partial_cmp(&a.score.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
}

fn rank(hits: &mut [SearchHit]) {
    for (i, hit) in hits.iter_mut().enumerate() {
        hit.rank = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> KeywordIndex {
        KeywordIndex::from_entries(vec![
            ("src/api/handler.ts".to_string(), vec!["handle"]),
            ("src/api/routes.ts".to_string(), vec![]),
            ("src/core/cache.ts".to_string(), vec!["Cache"]),
            ("src/core/store.ts".to_string(), vec![]),
            ("docs/README.md".to_string(), vec![]),
        ])
    }

    fn paths(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.file_path.as_str()).collect()
    }

    #[test]
    fn primary_hits_are_ranked() {
        let results = index()
            .search(&SearchQuery::new("add caching to the API", 10))
            .unwrap();
        assert_eq!(
            paths(&results.primary),
            vec!["src/core/cache.ts", "src/api/handler.ts", "src/api/routes.ts"]
        );
        assert_eq!(results.primary[0].rank, 1);
        assert_eq!(paths(&results.related), vec!["src/core/store.ts"]);
        assert!((results.related[0].score.overall - 0.25).abs() < 1e-6);
    }

    #[test]
    fn top_k_and_related_toggle() {
        let mut query = SearchQuery::new("add caching to the API", 1);
        query.include_related = false;
        let results = index().search(&query).unwrap();
        assert_eq!(paths(&results.primary), vec!["src/core/cache.ts"]);
        assert!(results.related.is_empty());
    }

    #[test]
    fn empty_query_is_an_error() {
        assert!(matches!(
            index().search(&SearchQuery::new("  ?! ", 5)),
            Err(IndexError::EmptyQuery)
        ));
    }

    #[test]
    fn indexable_files() {
        assert!(is_indexable(Path::new("deploy/Dockerfile")));
        assert!(is_indexable(Path::new(".env.example")));
        assert!(is_indexable(Path::new("README.MD")));
        assert!(!is_indexable(Path::new("logo.png")));
    }
}
