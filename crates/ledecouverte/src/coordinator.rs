//! Three-phase discovery: semantic, relationship expansion, structural.
//!
//! Every provider call goes through the shared [`OrchestrationSupervisor`], so
//! a failing or slow provider degrades the result instead of aborting it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use lesuperviseur::{
    CancellationToken, OrchestrationSupervisor, RetryPolicy, Supervised, SupervisorError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::impact::{
    CodeElement, Confidence, DiscoveredFile, DiscoveredImpact, DiscoveryOrigin, DiscoveryPhase,
    ImpactLevel, PhaseReport, ProcessingStrategy, RelatedFile, ScoredFile,
    EXPANSION_RELATIONSHIPS,
};
use crate::model::OrchestrationRequest;
use crate::paths::{normalize_path, same_file};
use crate::providers::{
    DiscoveryQuery, FileDiscovery, FileDiscoveryProvider, GraphService, StructuralAnalyzer,
};

/// Tunables of the discovery coordinator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Upper bound on primary semantic hits.
    pub max_files: usize,
    /// Ask the semantic provider for related files.
    pub include_related: bool,
    /// Relationship expansion depth; zero disables expansion.
    pub expansion_depth: usize,
    /// Depth passed to the structural analyzer.
    pub structural_depth: usize,
    /// Width of the per-file worker pool.
    pub concurrency: usize,
    /// Policy for whole-phase calls (semantic discovery).
    pub phase_policy: RetryPolicy,
    /// Policy for per-file calls (expansion, structural).
    pub file_policy: RetryPolicy,
    /// Policy for provider initialization.
    pub init_policy: RetryPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_files: 50,
            include_related: true,
            expansion_depth: 3,
            structural_depth: 2,
            concurrency: 8,
            phase_policy: RetryPolicy::default(),
            file_policy: RetryPolicy::new(2, 10_000),
            init_policy: RetryPolicy::default(),
        }
    }
}

/// Ordered, deduplicated candidate set owned by one discovery run.
#[derive(Debug, Default)]
struct CandidateSet {
    files: Vec<DiscoveredFile>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    /// Insert or merge; returns true if the path was new.
    fn insert(&mut self, file: DiscoveredFile) -> bool {
        match self.index.get(&file.file_path) {
            Some(&slot) => {
                let existing = self.files[slot].clone();
                self.files[slot] = existing.merge(file);
                false
            }
            None => {
                self.index.insert(file.file_path.clone(), self.files.len());
                self.files.push(file);
                true
            }
        }
    }

    fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_path.clone()).collect()
    }

    fn attach_elements(&mut self, path: &str, elements: Vec<CodeElement>) {
        if let Some(&slot) = self.index.get(path) {
            self.files[slot].elements = elements;
        }
    }

    fn into_files(self) -> Vec<DiscoveredFile> {
        self.files
    }
}

/// Runs the discovery phases against injected providers.
pub struct DiscoveryCoordinator {
    discovery: Arc<dyn FileDiscoveryProvider>,
    graph: Arc<dyn GraphService>,
    structure: Arc<dyn StructuralAnalyzer>,
    supervisor: Arc<OrchestrationSupervisor>,
    config: DiscoveryConfig,
}

impl std::fmt::Debug for DiscoveryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCoordinator")
            .field("discovery", &self.discovery.name())
            .field("graph", &self.graph.name())
            .field("structure", &self.structure.name())
            .field("config", &self.config)
            .finish()
    }
}

impl DiscoveryCoordinator {
    /// Create a coordinator with default tunables.
    pub fn new(
        discovery: Arc<dyn FileDiscoveryProvider>,
        graph: Arc<dyn GraphService>,
        structure: Arc<dyn StructuralAnalyzer>,
        supervisor: Arc<OrchestrationSupervisor>,
    ) -> Self {
        Self {
            discovery,
            graph,
            structure,
            supervisor,
            config: DiscoveryConfig::default(),
        }
    }

    /// Replace the tunables.
    #[must_use]
    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Current tunables.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Supervisor shared by every phase.
    pub fn supervisor(&self) -> &Arc<OrchestrationSupervisor> {
        &self.supervisor
    }

    /// Bring up the providers.
    ///
    /// The discovery provider and the graph service are required: failing to
    /// start either is fatal. The structural analyzer is best-effort.
    pub async fn initialize(&self) -> Result<(), SupervisorError> {
        let policy = self.config.init_policy;

        self.supervisor
            .initialize(self.discovery.name(), policy, |token| {
                self.discovery.initialize(token)
            })
            .await?;
        self.supervisor
            .initialize(self.graph.name(), policy, |token| self.graph.initialize(token))
            .await?;

        let structural = self
            .supervisor
            .run_with(
                &format!("initialize:{}", self.structure.name()),
                policy,
                |token| self.structure.initialize(token),
                (),
            )
            .await;
        if structural.is_fallback() {
            warn!(
                "structural analyzer '{}' unavailable, structural phase will degrade",
                self.structure.name()
            );
        }
        Ok(())
    }

    /// Run all phases for `request` and merge their output.
    ///
    /// Never fails: each phase falls back independently and the degradation is
    /// visible through `confidence`, `processing_strategy` and `phases`.
    pub async fn discover(&self, request: &OrchestrationRequest) -> DiscoveredImpact {
        let root = request.project_path.as_path();
        let mut candidates = CandidateSet::default();
        let mut phases = Vec::with_capacity(3);

        info!(
            "discovery started for '{}' (intent: {})",
            request.query, request.intent
        );

        // Semantic
        let started = Instant::now();
        let query = DiscoveryQuery {
            query: request.query.clone(),
            project_path: request.project_path.clone(),
            project_id: request.project_id.clone(),
            intent: request.intent,
            max_files: self.config.max_files,
            include_related: self.config.include_related,
        };
        let semantic = self
            .supervisor
            .run_with(
                "semantic-discovery",
                self.config.phase_policy,
                |token| self.discovery.discover(&query, token),
                FileDiscovery::default(),
            )
            .await;
        let semantic_failed = semantic.is_fallback();
        let FileDiscovery {
            primary_files,
            related_files,
        } = semantic.value;

        let semantic_files = normalize_scored(root, primary_files, self.config.max_files);
        let related_files = normalize_scored(root, related_files, usize::MAX);
        for scored in &semantic_files {
            candidates.insert(DiscoveredFile::from_scored(
                scored.file_path.clone(),
                scored,
                DiscoveryOrigin::Semantic,
            ));
        }
        for scored in &related_files {
            candidates.insert(DiscoveredFile::from_scored(
                scored.file_path.clone(),
                scored,
                DiscoveryOrigin::SemanticRelated,
            ));
        }
        phases.push(PhaseReport::from_counts(
            DiscoveryPhase::Semantic,
            1,
            usize::from(semantic_failed),
            elapsed_ms(started),
        ));
        debug!(
            "semantic phase: {} primary, {} related",
            semantic_files.len(),
            related_files.len()
        );

        // Relationship expansion
        let started = Instant::now();
        let seeds = if self.config.expansion_depth == 0 {
            Vec::new()
        } else {
            candidates.paths()
        };
        let expanded: Vec<Supervised<Vec<RelatedFile>>> = stream::iter(seeds.iter())
            .map(|seed| self.expand_file(root, seed))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let expansion_failures = expanded.iter().filter(|r| r.is_fallback()).count();
        let mut relationship_files = Vec::new();
        let mut added = 0;
        for result in expanded {
            for related in result.value {
                if candidates.insert(DiscoveredFile::from_related(&related)) {
                    added += 1;
                }
                relationship_files.push(related);
            }
        }
        phases.push(PhaseReport::from_counts(
            DiscoveryPhase::RelationshipExpansion,
            seeds.len(),
            expansion_failures,
            elapsed_ms(started),
        ));
        debug!(
            "relationship phase: {} edges, {} new files, {} failed seeds",
            relationship_files.len(),
            added,
            expansion_failures
        );

        // Structural
        let started = Instant::now();
        let targets = candidates.paths();
        let analyzed: Vec<Supervised<Vec<CodeElement>>> = stream::iter(targets.iter())
            .map(|path| self.analyze_file(root, path))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let structural_failures = analyzed.iter().filter(|r| r.is_fallback()).count();
        let mut code_elements = BTreeMap::new();
        for (path, result) in targets.iter().zip(analyzed) {
            if result.value.is_empty() {
                continue;
            }
            candidates.attach_elements(path, result.value.clone());
            code_elements.insert(path.clone(), result.value);
        }
        phases.push(PhaseReport::from_counts(
            DiscoveryPhase::Structural,
            targets.len(),
            structural_failures,
            elapsed_ms(started),
        ));

        let confidence = if semantic_failed {
            Confidence::Low
        } else {
            Confidence::High
        };
        let processing_strategy = ProcessingStrategy::from_phases(&phases);
        let files = candidates.into_files();

        info!(
            "discovery finished: {} files, {} with elements, strategy {:?}",
            files.len(),
            code_elements.len(),
            processing_strategy
        );

        DiscoveredImpact {
            query: request.query.clone(),
            intent: request.intent,
            semantic_files,
            related_files,
            relationship_files,
            code_elements,
            files,
            confidence,
            processing_strategy,
            phases,
        }
    }

    async fn expand_file(&self, root: &Path, seed: &str) -> Supervised<Vec<RelatedFile>> {
        self.supervisor
            .run_with(
                &format!("relationship-expansion:{seed}"),
                self.config.file_policy,
                |token| self.related_for(root, seed, token),
                Vec::new(),
            )
            .await
    }

    async fn related_for(
        &self,
        root: &Path,
        seed: &str,
        token: CancellationToken,
    ) -> anyhow::Result<Vec<RelatedFile>> {
        let nodes = self.graph.search(seed, token.clone()).await?;
        let mut related: Vec<RelatedFile> = Vec::new();

        let anchors = nodes.iter().filter(|node| {
            node.file_path
                .as_deref()
                .is_some_and(|path| same_file(&normalize_path(root, path), seed))
        });
        for anchor in anchors {
            let reached = self
                .graph
                .find_related(
                    &anchor.id,
                    self.config.expansion_depth,
                    &EXPANSION_RELATIONSHIPS,
                    token.clone(),
                )
                .await?;

            for node in reached {
                let Some(raw) = node.file_path.as_deref() else {
                    continue;
                };
                let path = normalize_path(root, raw);
                if path.is_empty() || same_file(&path, seed) {
                    continue;
                }
                let depth = node.depth.unwrap_or(1).max(1);
                match related
                    .iter_mut()
                    .find(|r| r.file_path == path && r.relationship == node.relationship)
                {
                    Some(existing) if existing.depth <= depth => {}
                    Some(existing) => {
                        existing.depth = depth;
                        existing.impact_level = ImpactLevel::from_depth(depth);
                    }
                    None => related.push(RelatedFile {
                        file_path: path,
                        source_file: seed.to_string(),
                        relationship: node.relationship,
                        depth,
                        impact_level: ImpactLevel::from_depth(depth),
                    }),
                }
            }
        }
        Ok(related)
    }

    async fn analyze_file(&self, root: &Path, path: &str) -> Supervised<Vec<CodeElement>> {
        self.supervisor
            .run_with(
                &format!("structural:{path}"),
                self.config.file_policy,
                |token| self.elements_for(root, path, token),
                Vec::new(),
            )
            .await
    }

    async fn elements_for(
        &self,
        root: &Path,
        path: &str,
        token: CancellationToken,
    ) -> anyhow::Result<Vec<CodeElement>> {
        let analysis = self
            .structure
            .analyze(&root.join(path), self.config.structural_depth, token)
            .await?;

        Ok(analysis
            .relevant_files
            .into_iter()
            .filter(|file| same_file(&normalize_path(root, &file.file_path), path))
            .flat_map(|file| file.elements)
            .map(|mut element| {
                element.file_path = path.to_string();
                element
            })
            .collect())
    }
}

fn normalize_scored(root: &Path, files: Vec<ScoredFile>, limit: usize) -> Vec<ScoredFile> {
    let mut seen = std::collections::HashSet::new();
    files
        .into_iter()
        .filter_map(|mut file| {
            file.file_path = normalize_path(root, &file.file_path);
            let fresh = !file.file_path.is_empty() && seen.insert(file.file_path.clone());
            fresh.then_some(file)
        })
        .take(limit)
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
