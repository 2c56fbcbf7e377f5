// Provider adapters
//
// Backs the discovery contracts with the in-process keyword index,
// relationship graph and source scanner.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use ledecouverte::{
    CodeElement, DiscoveryQuery, ElementKind, FileDiscovery, FileDiscoveryProvider, GraphNode,
    GraphService, RelationshipType, ScoredFile, StructuralAnalysis, StructuralAnalyzer,
    StructuralFile,
};
use legraphe::{EdgeType, Node, RelationshipGraph, Traversal};
use leparse::languages::Language;
use leparse::parallel::ParallelScanner;
use leparse::scanner::{discover_source_files, scan_file};
use leparse::traits::{ParsedFile, SymbolKind};
use lerecherche::{IndexError, KeywordIndex, SearchHit, SearchQuery};
use lesuperviseur::CancellationToken;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Keyword index and relationship graph of one project.
#[derive(Debug)]
pub struct ProjectSnapshot {
    /// Project root
    pub root: PathBuf,
    /// Keyword/path index over every indexable file
    pub index: KeywordIndex,
    /// Relationship graph; indexed files without a scanner get a bare file node
    pub graph: RelationshipGraph,
}

impl ProjectSnapshot {
    /// Walk and scan `root`.
    pub fn build(root: &Path) -> anyhow::Result<Self> {
        let index = KeywordIndex::build(root, None)
            .with_context(|| format!("Failed to index project: {}", root.display()))?;
        let mut graph = RelationshipGraph::build(root)
            .with_context(|| format!("Failed to build relationship graph: {}", root.display()))?;

        let mut bare = 0;
        for path in index.paths() {
            if graph.node(path).is_none() {
                graph.add_file(path);
                bare += 1;
            }
        }

        let stats = graph.stats();
        info!(
            "Project snapshot ready: {} indexed files, {} graph files ({} without relationships), {} edges",
            index.len(),
            stats.files,
            bare,
            stats.edges
        );
        Ok(Self {
            root: root.to_path_buf(),
            index,
            graph,
        })
    }
}

type SnapshotBuild = Shared<BoxFuture<'static, Result<Arc<ProjectSnapshot>, Arc<anyhow::Error>>>>;

/// Lazily built, shared [`ProjectSnapshot`].
pub struct ProjectWorkspace {
    root: PathBuf,
    build: Mutex<Option<SnapshotBuild>>,
}

impl std::fmt::Debug for ProjectWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectWorkspace")
            .field("root", &self.root)
            .field("ready", &self.get().is_some())
            .finish()
    }
}

impl ProjectWorkspace {
    /// Workspace over `root`; nothing is scanned until first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            build: Mutex::new(None),
        }
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot if already built
    pub fn get(&self) -> Option<Arc<ProjectSnapshot>> {
        let build = self.build.lock().unwrap_or_else(PoisonError::into_inner);
        build
            .as_ref()
            .and_then(|b| b.peek())
            .and_then(|result| result.as_ref().ok().cloned())
    }

    /// Snapshot, building it on the blocking pool on first use.
    ///
    /// The build outlives a cancelled or timed-out caller; later calls await
    /// the same build. A failed build is started again by the next call.
    pub async fn load(&self, cancel: &CancellationToken) -> anyhow::Result<Arc<ProjectSnapshot>> {
        let build = self.shared_build();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("cancelled while building project snapshot"),
            snapshot = build => snapshot.map_err(|err| anyhow!("{err:#}")),
        }
    }

    fn shared_build(&self) -> SnapshotBuild {
        let mut slot = self.build.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(build) = slot.as_ref() {
            if !matches!(build.peek(), Some(Err(_))) {
                return build.clone();
            }
            debug!("Previous snapshot build of {} failed, rebuilding", self.root.display());
        }

        let root = self.root.clone();
        let task = tokio::task::spawn_blocking(move || ProjectSnapshot::build(&root));
        let build = async move {
            match task.await {
                Ok(Ok(snapshot)) => Ok(Arc::new(snapshot)),
                Ok(Err(err)) => Err(Arc::new(err)),
                Err(err) => Err(Arc::new(
                    anyhow::Error::new(err).context("Snapshot build task failed"),
                )),
            }
        }
        .boxed()
        .shared();
        *slot = Some(build.clone());
        build
    }
}

/// File discovery over the keyword index.
#[derive(Debug)]
pub struct KeywordDiscovery {
    workspace: Arc<ProjectWorkspace>,
}

impl KeywordDiscovery {
    /// Discovery over a shared workspace
    pub fn new(workspace: Arc<ProjectWorkspace>) -> Self {
        Self { workspace }
    }
}

fn scored(hit: SearchHit) -> ScoredFile {
    ScoredFile::new(hit.file_path, hit.score.overall.clamp(0.0, 1.0))
}

#[async_trait]
impl FileDiscoveryProvider for KeywordDiscovery {
    fn name(&self) -> &str {
        "keyword-index"
    }

    async fn initialize(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.workspace.load(&cancel).await.map(|_| ())
    }

    async fn discover(
        &self,
        query: &DiscoveryQuery,
        cancel: CancellationToken,
    ) -> anyhow::Result<FileDiscovery> {
        let snapshot = self.workspace.load(&cancel).await?;

        let mut search = SearchQuery::new(query.query.as_str(), query.max_files);
        search.include_related = query.include_related;
        let results = match snapshot.index.search(&search) {
            Ok(results) => results,
            Err(IndexError::EmptyQuery) => {
                debug!("No searchable terms in {:?}", query.query);
                return Ok(FileDiscovery::default());
            }
            Err(err) => return Err(err.into()),
        };

        Ok(FileDiscovery {
            primary_files: results.primary.into_iter().map(scored).collect(),
            related_files: results.related.into_iter().map(scored).collect(),
        })
    }
}

/// Graph service over the relationship graph.
#[derive(Debug)]
pub struct GraphAdapter {
    workspace: Arc<ProjectWorkspace>,
}

impl GraphAdapter {
    /// Graph service over a shared workspace
    pub fn new(workspace: Arc<ProjectWorkspace>) -> Self {
        Self { workspace }
    }
}

const EDGE_TYPES: [EdgeType; 3] = [EdgeType::Imports, EdgeType::Tests, EdgeType::Defines];

/// Graph edge types matching an allow-list; empty in, empty out.
pub fn edge_types(relationships: &[RelationshipType]) -> Vec<EdgeType> {
    EDGE_TYPES
        .into_iter()
        .filter(|edge| {
            RelationshipType::parse(edge.label()).is_some_and(|r| relationships.contains(&r))
        })
        .collect()
}

fn graph_node(node: &Node, relationship: Option<EdgeType>, depth: Option<usize>) -> GraphNode {
    GraphNode {
        id: node.id.clone(),
        name: node.name.clone(),
        file_path: Some(node.file_path.clone()),
        relationship: relationship.and_then(|edge| RelationshipType::parse(edge.label())),
        depth,
    }
}

#[async_trait]
impl GraphService for GraphAdapter {
    fn name(&self) -> &str {
        "relationship-graph"
    }

    async fn initialize(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.workspace.load(&cancel).await.map(|_| ())
    }

    async fn search(&self, text: &str, cancel: CancellationToken) -> anyhow::Result<Vec<GraphNode>> {
        let snapshot = self.workspace.load(&cancel).await?;
        Ok(snapshot
            .graph
            .search(text)
            .into_iter()
            .map(|node| graph_node(node, None, None))
            .collect())
    }

    // Only file nodes are reported; symbols are reachable but carry no new path.
    async fn find_related(
        &self,
        node_id: &str,
        max_depth: usize,
        relationships: &[RelationshipType],
        cancel: CancellationToken,
    ) -> anyhow::Result<Vec<GraphNode>> {
        let snapshot = self.workspace.load(&cancel).await?;
        if cancel.is_cancelled() {
            bail!("graph query cancelled");
        }

        let allowed = edge_types(relationships);
        if allowed.is_empty() && !relationships.is_empty() {
            return Ok(Vec::new());
        }

        let related = snapshot
            .graph
            .find_related(node_id, max_depth, &allowed, Traversal::Both)?;
        Ok(related
            .into_iter()
            .filter(|r| r.node.is_file())
            .map(|r| graph_node(&r.node, Some(r.relationship), Some(r.depth)))
            .collect())
    }
}

/// Structural analyzer over the regex scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanAnalyzer;

impl ScanAnalyzer {
    /// Create an analyzer
    pub fn new() -> Self {
        Self
    }
}

fn element_kind(kind: SymbolKind) -> ElementKind {
    match kind {
        SymbolKind::Class | SymbolKind::Struct | SymbolKind::Enum => ElementKind::Class,
        SymbolKind::Interface | SymbolKind::Trait => ElementKind::Interface,
        SymbolKind::Function => ElementKind::Function,
    }
}

fn structural_file(parsed: ParsedFile) -> StructuralFile {
    let file_path = parsed.path.to_string_lossy().replace('\\', "/");
    let elements = parsed
        .symbols
        .into_iter()
        .map(|symbol| CodeElement {
            name: symbol.name,
            kind: element_kind(symbol.kind),
            file_path: file_path.clone(),
            line: symbol.line,
        })
        .collect();
    StructuralFile {
        file_path,
        elements,
    }
}

/// Scan a file, or the source files under a directory up to `max_depth`.
///
/// Files in unsupported languages have no elements. Unreadable files inside a
/// directory are skipped; an unreadable single file is an error.
pub fn analyze_path(path: &Path, max_depth: usize) -> anyhow::Result<StructuralAnalysis> {
    if path.is_dir() {
        let files = discover_source_files(path, Some(max_depth))?;
        let relevant_files = ParallelScanner::new()
            .scan_files(files)
            .into_iter()
            .filter_map(|result| result.parsed)
            .map(structural_file)
            .collect();
        return Ok(StructuralAnalysis { relevant_files });
    }

    if Language::from_path(path).is_none() {
        return Ok(StructuralAnalysis::default());
    }
    let parsed = scan_file(path).with_context(|| format!("Failed to scan {}", path.display()))?;
    Ok(StructuralAnalysis {
        relevant_files: vec![structural_file(parsed)],
    })
}

#[async_trait]
impl StructuralAnalyzer for ScanAnalyzer {
    fn name(&self) -> &str {
        "regex-scanner"
    }

    async fn analyze(
        &self,
        path: &Path,
        max_depth: usize,
        cancel: CancellationToken,
    ) -> anyhow::Result<StructuralAnalysis> {
        let path = path.to_path_buf();
        let scan = tokio::task::spawn_blocking(move || analyze_path(&path, max_depth));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("structural analysis cancelled"),
            result = scan => result.context("Scan task failed")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/api")).unwrap();
        fs::create_dir_all(root.join("src/core")).unwrap();
        fs::write(
            root.join("src/api/handler.ts"),
            "import { Cache } from \"../core/cache\";\nexport function handle() {}\n",
        )
        .unwrap();
        fs::write(
            root.join("src/core/cache.ts"),
            "export class Cache {}\nexport interface Store {}\n",
        )
        .unwrap();
        fs::write(root.join("README.md"), "# demo\n").unwrap();
        dir
    }

    #[test]
    fn edge_type_allow_list() {
        assert_eq!(
            edge_types(&[RelationshipType::Imports, RelationshipType::Uses]),
            vec![EdgeType::Imports]
        );
        assert_eq!(edge_types(&ledecouverte::EXPANSION_RELATIONSHIPS).len(), 3);
        assert!(edge_types(&[]).is_empty());
    }

    #[test]
    fn element_kinds() {
        assert_eq!(element_kind(SymbolKind::Struct), ElementKind::Class);
        assert_eq!(element_kind(SymbolKind::Trait), ElementKind::Interface);
        assert_eq!(element_kind(SymbolKind::Function), ElementKind::Function);
    }

    #[test]
    fn snapshot_adds_bare_file_nodes() {
        let dir = project();
        let snapshot = ProjectSnapshot::build(dir.path()).unwrap();
        assert!(snapshot.graph.node("README.md").is_some());
        assert!(snapshot.graph.node("src/core/cache.ts").is_some());
        assert_eq!(snapshot.index.len(), 3);
    }

    #[tokio::test]
    async fn keyword_discovery_ranks_files() {
        let dir = project();
        let discovery = KeywordDiscovery::new(Arc::new(ProjectWorkspace::new(dir.path())));
        let query = DiscoveryQuery {
            query: "add caching".to_string(),
            project_path: dir.path().to_path_buf(),
            project_id: "demo".to_string(),
            intent: ledecouverte::Intent::Search,
            max_files: 10,
            include_related: true,
        };

        let found = discovery
            .discover(&query, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(found.primary_files[0].file_path, "src/core/cache.ts");
        assert!(found
            .primary_files
            .iter()
            .all(|f| (0.0..=1.0).contains(&f.relevance_score)));
    }

    #[tokio::test]
    async fn graph_adapter_reports_file_neighbours() {
        let dir = project();
        let graph = GraphAdapter::new(Arc::new(ProjectWorkspace::new(dir.path())));
        let token = CancellationToken::new();

        let hits = graph.search("src/core/cache.ts", token.clone()).await.unwrap();
        assert_eq!(hits[0].id, "src/core/cache.ts");

        let related = graph
            .find_related(
                "src/core/cache.ts",
                3,
                &ledecouverte::EXPANSION_RELATIONSHIPS,
                token.clone(),
            )
            .await
            .unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].file_path.as_deref(), Some("src/api/handler.ts"));
        assert_eq!(related[0].relationship, Some(RelationshipType::Imports));
        assert_eq!(related[0].depth, Some(1));

        let none = graph
            .find_related("src/core/cache.ts", 3, &[RelationshipType::Calls], token)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn graph_adapter_unknown_node_is_an_error() {
        let dir = project();
        let graph = GraphAdapter::new(Arc::new(ProjectWorkspace::new(dir.path())));
        let result = graph
            .find_related("nope.ts", 2, &[], CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancelled_load_fails_but_build_completes() {
        let dir = project();
        let workspace = ProjectWorkspace::new(dir.path());
        let token = CancellationToken::new();
        token.cancel();
        assert!(workspace.load(&token).await.is_err());

        let mut waited = 0;
        while workspace.get().is_none() && waited < 200 {
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
            waited += 1;
        }
        let built = workspace.get().expect("build finished without a waiting caller");

        let loaded = workspace.load(&CancellationToken::new()).await.unwrap();
        assert!(Arc::ptr_eq(&built, &loaded));
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_build() {
        let dir = project();
        let workspace = ProjectWorkspace::new(dir.path());
        let token = CancellationToken::new();

        let (a, b) = tokio::join!(workspace.load(&token), workspace.load(&token));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }

    #[tokio::test]
    async fn failed_build_is_retried() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("later");
        let workspace = ProjectWorkspace::new(&root);
        let token = CancellationToken::new();

        assert!(workspace.load(&token).await.is_err());
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/lib.rs"), "pub fn ready() {}\n").unwrap();

        let snapshot = workspace.load(&token).await.unwrap();
        assert_eq!(snapshot.index.len(), 1);
    }

    #[tokio::test]
    async fn scan_analyzer_files_and_dirs() {
        let dir = project();
        let analyzer = ScanAnalyzer::new();

        let file = analyzer
            .analyze(&dir.path().join("src/core/cache.ts"), 2, CancellationToken::new())
            .await
            .unwrap();
        let names: Vec<_> = file.relevant_files[0]
            .elements
            .iter()
            .map(|e| (e.name.as_str(), e.kind))
            .collect();
        assert_eq!(
            names,
            vec![("Cache", ElementKind::Class), ("Store", ElementKind::Interface)]
        );

        let readme = analyzer
            .analyze(&dir.path().join("README.md"), 2, CancellationToken::new())
            .await
            .unwrap();
        assert!(readme.relevant_files.is_empty());

        let tree = analyze_path(dir.path(), 3).unwrap();
        assert_eq!(tree.relevant_files.len(), 2);

        assert!(analyze_path(&dir.path().join("src/missing.ts"), 1).is_err());
    }
}
