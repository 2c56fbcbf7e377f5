// Discovery coordinator tests against in-memory providers

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ledecouverte::{
    CancellationToken, CodeElement, Confidence, DiscoveryConfig, DiscoveryCoordinator,
    DiscoveryOrigin, DiscoveryPhase, DiscoveryQuery, ElementKind, FileDiscovery,
    FileDiscoveryProvider, GraphNode, GraphService, ImpactLevel, Intent, OrchestrationRequest,
    PhaseOutcome, ProcessingStrategy, RelationshipType, ScoredFile, StructuralAnalysis,
    StructuralAnalyzer, StructuralFile,
};
use lesuperviseur::{OrchestrationSupervisor, RetryPolicy, SupervisorError};

struct StaticDiscovery {
    primary: Vec<ScoredFile>,
    related: Vec<ScoredFile>,
    calls: AtomicUsize,
}

impl StaticDiscovery {
    fn new(primary: &[(&str, f32)], related: &[(&str, f32)]) -> Self {
        let scored = |files: &[(&str, f32)]| {
            files
                .iter()
                .map(|(path, score)| ScoredFile::new(*path, *score))
                .collect()
        };
        Self {
            primary: scored(primary),
            related: scored(related),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FileDiscoveryProvider for StaticDiscovery {
    fn name(&self) -> &str {
        "static"
    }

    async fn discover(
        &self,
        _query: &DiscoveryQuery,
        _cancel: CancellationToken,
    ) -> anyhow::Result<FileDiscovery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FileDiscovery {
            primary_files: self.primary.clone(),
            related_files: self.related.clone(),
        })
    }
}

#[derive(Default)]
struct BrokenDiscovery {
    calls: AtomicUsize,
    fail_init: bool,
}

#[async_trait]
impl FileDiscoveryProvider for BrokenDiscovery {
    fn name(&self) -> &str {
        "broken"
    }

    async fn initialize(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        if self.fail_init {
            anyhow::bail!("index unavailable");
        }
        Ok(())
    }

    async fn discover(
        &self,
        _query: &DiscoveryQuery,
        _cancel: CancellationToken,
    ) -> anyhow::Result<FileDiscovery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("search backend down")
    }
}

/// Waits until its token is cancelled, then records the cancellation.
#[derive(Default)]
struct HangingDiscovery {
    observed_cancel: Arc<AtomicBool>,
}

#[async_trait]
impl FileDiscoveryProvider for HangingDiscovery {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn discover(
        &self,
        _query: &DiscoveryQuery,
        cancel: CancellationToken,
    ) -> anyhow::Result<FileDiscovery> {
        let flag = Arc::clone(&self.observed_cancel);
        let watcher = cancel.clone();
        tokio::spawn(async move {
            watcher.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(FileDiscovery::default())
    }
}

/// Graph keyed by file path; `search` returns a single node per known file.
#[derive(Default)]
struct MapGraph {
    edges: HashMap<String, Vec<GraphNode>>,
    failing: Vec<String>,
}

impl MapGraph {
    fn edge(mut self, from: &str, to: &str, relationship: RelationshipType, depth: usize) -> Self {
        self.edges
            .entry(from.to_string())
            .or_default()
            .push(GraphNode {
                id: to.to_string(),
                name: to.to_string(),
                file_path: Some(to.to_string()),
                relationship: Some(relationship),
                depth: Some(depth),
            });
        self
    }

    fn failing(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }
}

#[async_trait]
impl GraphService for MapGraph {
    fn name(&self) -> &str {
        "map-graph"
    }

    async fn search(
        &self,
        text: &str,
        _cancel: CancellationToken,
    ) -> anyhow::Result<Vec<GraphNode>> {
        if self.failing.iter().any(|f| f == text) {
            anyhow::bail!("graph query failed for {text}");
        }
        Ok(vec![GraphNode {
            id: text.to_string(),
            name: text.to_string(),
            file_path: Some(text.to_string()),
            relationship: None,
            depth: None,
        }])
    }

    async fn find_related(
        &self,
        node_id: &str,
        max_depth: usize,
        _relationships: &[RelationshipType],
        _cancel: CancellationToken,
    ) -> anyhow::Result<Vec<GraphNode>> {
        Ok(self
            .edges
            .get(node_id)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|n| n.depth.unwrap_or(1) <= max_depth)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Reports one function per analyzed file, failing for listed paths.
#[derive(Default)]
struct FakeStructure {
    failing: Vec<String>,
}

#[async_trait]
impl StructuralAnalyzer for FakeStructure {
    fn name(&self) -> &str {
        "fake-structure"
    }

    async fn analyze(
        &self,
        path: &Path,
        _max_depth: usize,
        _cancel: CancellationToken,
    ) -> anyhow::Result<StructuralAnalysis> {
        let path = path.to_string_lossy().to_string();
        if self.failing.iter().any(|f| path.ends_with(f.as_str())) {
            anyhow::bail!("parse error in {path}");
        }
        let stem = Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(StructuralAnalysis {
            relevant_files: vec![StructuralFile {
                file_path: path.clone(),
                elements: vec![CodeElement {
                    name: format!("{stem}_main"),
                    kind: ElementKind::Function,
                    file_path: path,
                    line: 1,
                }],
            }],
        })
    }
}

fn fast_config() -> DiscoveryConfig {
    let quick = RetryPolicy::new(2, 200).with_base_delay(1);
    DiscoveryConfig {
        phase_policy: quick,
        file_policy: quick,
        init_policy: quick,
        ..DiscoveryConfig::default()
    }
}

fn coordinator(
    discovery: Arc<dyn FileDiscoveryProvider>,
    graph: MapGraph,
    structure: FakeStructure,
) -> DiscoveryCoordinator {
    DiscoveryCoordinator::new(
        discovery,
        Arc::new(graph),
        Arc::new(structure),
        Arc::new(OrchestrationSupervisor::default()),
    )
    .with_config(fast_config())
}

fn request() -> OrchestrationRequest {
    OrchestrationRequest::new("add caching to the API", Intent::Search, "/repo", "repo")
}

#[tokio::test]
async fn full_discovery_merges_all_phases() {
    let discovery = Arc::new(StaticDiscovery::new(
        &[("/repo/src/api/handler.ts", 0.9)],
        &[("src/core/cache.ts", 0.6)],
    ));
    let graph = MapGraph::default()
        .edge("src/api/handler.ts", "src/db/store.ts", RelationshipType::Imports, 1)
        .edge("src/api/handler.ts", "src/util/log.ts", RelationshipType::DependsOn, 3);

    let coordinator = coordinator(discovery, graph, FakeStructure::default());
    let impact = coordinator.discover(&request()).await;

    assert_eq!(impact.confidence, Confidence::High);
    assert_eq!(impact.processing_strategy, ProcessingStrategy::FullDiscovery);
    assert_eq!(
        impact.file_paths(),
        vec![
            "src/api/handler.ts",
            "src/core/cache.ts",
            "src/db/store.ts",
            "src/util/log.ts"
        ]
    );

    let store = impact.find("src/db/store.ts").expect("expanded file");
    assert_eq!(store.origin, DiscoveryOrigin::Relationship);
    assert_eq!(store.source_file.as_deref(), Some("src/api/handler.ts"));
    assert_eq!(store.impact_level, Some(ImpactLevel::Direct));

    let log = impact.find("src/util/log.ts").expect("cascading file");
    assert_eq!(log.impact_level, Some(ImpactLevel::Cascading));

    assert_eq!(impact.code_elements.len(), 4);
    assert_eq!(
        impact.code_elements["src/core/cache.ts"][0].file_path,
        "src/core/cache.ts"
    );
}

#[tokio::test]
async fn file_found_twice_keeps_richer_metadata() {
    let discovery = Arc::new(StaticDiscovery::new(
        &[("src/api/handler.ts", 0.9), ("src/core/cache.ts", 0.4)],
        &[],
    ));
    let graph = MapGraph::default().edge(
        "src/api/handler.ts",
        "src/core/cache.ts",
        RelationshipType::Imports,
        1,
    );

    let impact = coordinator(discovery, graph, FakeStructure::default())
        .discover(&request())
        .await;

    assert_eq!(impact.files.len(), 2);
    let cache = impact.find("src/core/cache.ts").expect("cache");
    assert_eq!(cache.origin, DiscoveryOrigin::Relationship);
    assert_eq!(cache.relationship, Some(RelationshipType::Imports));
    assert_eq!(impact.relationship_files.len(), 1);
}

#[tokio::test]
async fn failing_semantic_provider_falls_back() {
    let discovery = Arc::new(BrokenDiscovery::default());
    let impact = coordinator(
        discovery.clone(),
        MapGraph::default(),
        FakeStructure::default(),
    )
    .discover(&request())
    .await;

    assert!(impact.semantic_files.is_empty());
    assert!(impact.is_empty());
    assert_eq!(impact.confidence, Confidence::Low);
    assert_eq!(impact.processing_strategy, ProcessingStrategy::Fallback);
    assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        impact.phase(DiscoveryPhase::Semantic).map(|p| p.outcome),
        Some(PhaseOutcome::Fallback)
    );
}

#[tokio::test]
async fn one_failing_seed_does_not_abort_expansion() {
    let discovery = Arc::new(StaticDiscovery::new(
        &[("src/a.ts", 0.9), ("src/b.ts", 0.8)],
        &[],
    ));
    let graph = MapGraph::default()
        .edge("src/b.ts", "src/c.ts", RelationshipType::Uses, 2)
        .failing("src/a.ts");

    let impact = coordinator(discovery, graph, FakeStructure::default())
        .discover(&request())
        .await;

    assert!(impact.find("src/c.ts").is_some());
    let phase = impact
        .phase(DiscoveryPhase::RelationshipExpansion)
        .expect("phase report");
    assert_eq!(phase.outcome, PhaseOutcome::Degraded);
    assert_eq!(phase.failures, 1);
    assert_eq!(impact.confidence, Confidence::High);
    assert_eq!(impact.processing_strategy, ProcessingStrategy::PartialDiscovery);
}

#[tokio::test]
async fn structural_failure_degrades_to_empty_elements() {
    let discovery = Arc::new(StaticDiscovery::new(
        &[("src/a.ts", 0.9), ("src/broken.ts", 0.8)],
        &[],
    ));
    let structure = FakeStructure {
        failing: vec!["src/broken.ts".to_string()],
    };

    let impact = coordinator(discovery, MapGraph::default(), structure)
        .discover(&request())
        .await;

    assert_eq!(impact.files.len(), 2);
    assert!(impact.code_elements.contains_key("src/a.ts"));
    assert!(!impact.code_elements.contains_key("src/broken.ts"));
    assert!(impact
        .find("src/broken.ts")
        .is_some_and(|f| f.elements.is_empty()));
}

#[tokio::test]
async fn timed_out_discovery_is_cancelled() {
    let discovery = Arc::new(HangingDiscovery::default());
    let observed = Arc::clone(&discovery.observed_cancel);
    let mut config = fast_config();
    config.phase_policy = RetryPolicy::once(50);

    let coordinator = DiscoveryCoordinator::new(
        discovery,
        Arc::new(MapGraph::default()),
        Arc::new(FakeStructure::default()),
        Arc::new(OrchestrationSupervisor::default()),
    )
    .with_config(config);

    let impact = coordinator.discover(&request()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(impact.semantic_files.is_empty());
    assert!(observed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn required_provider_initialization_is_fatal() {
    let discovery = Arc::new(BrokenDiscovery {
        fail_init: true,
        ..BrokenDiscovery::default()
    });
    let coordinator = coordinator(discovery, MapGraph::default(), FakeStructure::default());

    let err = coordinator.initialize().await.expect_err("must fail");
    assert!(matches!(
        err,
        SupervisorError::InitializationFailed { attempts: 2, .. }
    ));
}

#[tokio::test]
async fn initialization_succeeds_with_default_hooks() {
    let discovery = Arc::new(StaticDiscovery::new(&[], &[]));
    let coordinator = coordinator(discovery, MapGraph::default(), FakeStructure::default());

    coordinator.initialize().await.expect("providers ready");
    let state = coordinator.supervisor().snapshot();
    assert!(!state.is_degraded());
    assert_eq!(state.records().len(), 3);
}
