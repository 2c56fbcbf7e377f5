// orchestrator - Planning Facade
//
// *L'Orchestrateur* (The Orchestrator) - Discovery, classification, task graph and plan in one call

use crate::adapters::{GraphAdapter, KeywordDiscovery, ProjectWorkspace, ScanAnalyzer};
use crate::config::PlannerConfig;
use crate::errors::{OrchestrationError, Result};
use chrono::{DateTime, Utc};
use ledecouverte::{
    Confidence, DiscoveredImpact, DiscoveryCoordinator, FileDiscoveryProvider, GraphService,
    OrchestrationRequest, ProcessingStrategy, StructuralAnalyzer,
};
use leplanification::{
    ExecutionPlan, ExecutionPlanner, ImpactAnalysisResult, ImpactAnalyzer, ImpactClassifier,
    OrchestrationTask, TaskGraphBuilder,
};
use lesuperviseur::{OrchestrationSupervisor, SupervisorState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Everything one orchestration call produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Project identifier the request ran under
    pub project_id: String,

    /// Discovery output, including per-phase reports
    pub discovered_impact: DiscoveredImpact,

    /// Tasks in planning order
    pub orchestrated_tasks: Vec<OrchestrationTask>,

    /// Parallel groups, sequential order and waves
    pub execution_plan: ExecutionPlan,

    /// Wall-clock time of the whole call in milliseconds
    pub processing_time_ms: u64,

    /// How complete discovery was
    pub processing_strategy: ProcessingStrategy,

    /// Whether the primary discovery provider answered
    pub confidence: Confidence,

    /// Token budget the tasks were sized against
    pub token_budget: usize,

    /// Completion timestamp
    pub generated_at: DateTime<Utc>,
}

/// Stable project identifier: `<dir-name>_<first 8 hex chars of blake3(path)>`
pub fn project_id(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("project");
    let hash = blake3::hash(path.to_string_lossy().as_bytes()).to_hex();
    format!("{}_{}", name, &hash.as_str()[..8])
}

/// True if both paths name the same directory; unresolvable paths compare as written
async fn same_project(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Runs the planning pipeline against injected providers.
///
/// Required providers are initialized once, on first use. Besides a task
/// graph defect, [`orchestrate`](Self::orchestrate) fails only when they
/// cannot start or when the request targets another project than the one
/// the built-in providers index.
pub struct Orchestrator {
    config: PlannerConfig,
    project_root: Option<PathBuf>,
    supervisor: Arc<OrchestrationSupervisor>,
    coordinator: DiscoveryCoordinator,
    impact: ImpactAnalyzer,
    classifier: ImpactClassifier,
    builder: TaskGraphBuilder,
    planner: ExecutionPlanner,
    ready: OnceCell<()>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("project_root", &self.project_root)
            .field("coordinator", &self.coordinator)
            .field("builder", &self.builder)
            .field("ready", &self.ready.initialized())
            .finish()
    }
}

impl Orchestrator {
    /// Orchestrator over the built-in keyword index, relationship graph and scanner.
    ///
    /// The providers index `project_path` only; requests for any other
    /// project are rejected with [`OrchestrationError::ProjectMismatch`].
    pub fn for_project(project_path: impl Into<PathBuf>, config: PlannerConfig) -> Self {
        let project_path = project_path.into();
        let workspace = Arc::new(ProjectWorkspace::new(project_path.clone()));
        let mut orchestrator = Self::with_providers(
            Arc::new(KeywordDiscovery::new(Arc::clone(&workspace))),
            Arc::new(GraphAdapter::new(workspace)),
            Arc::new(ScanAnalyzer::new()),
            config,
        );
        orchestrator.project_root = Some(project_path);
        orchestrator
    }

    /// Orchestrator over caller-supplied providers; project paths are passed through as given
    pub fn with_providers(
        discovery: Arc<dyn FileDiscoveryProvider>,
        graph: Arc<dyn GraphService>,
        structure: Arc<dyn StructuralAnalyzer>,
        config: PlannerConfig,
    ) -> Self {
        let supervisor = Arc::new(OrchestrationSupervisor::new(config.phase_policy()));
        let coordinator = DiscoveryCoordinator::new(
            discovery,
            Arc::clone(&graph),
            structure,
            Arc::clone(&supervisor),
        )
        .with_config(config.discovery_config());
        let impact =
            ImpactAnalyzer::new(graph, Arc::clone(&supervisor)).with_config(config.impact_config());

        Self {
            builder: config.task_builder(),
            config,
            project_root: None,
            supervisor,
            coordinator,
            impact,
            classifier: ImpactClassifier::default(),
            planner: ExecutionPlanner::new(),
            ready: OnceCell::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Project the built-in providers are bound to, if any
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Records of every supervised operation so far
    pub fn supervisor_state(&self) -> SupervisorState {
        self.supervisor.snapshot()
    }

    /// Start the required providers if not done yet
    pub async fn initialize(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.coordinator.initialize())
            .await?;
        Ok(())
    }

    /// Plan `request`: discover, classify, build the task graph, schedule it.
    pub async fn orchestrate(&self, request: OrchestrationRequest) -> Result<OrchestrationResult> {
        let started = Instant::now();
        let request = self.prepare(request);
        self.check_project(&request.project_path).await?;
        self.initialize().await?;

        let discovered_impact = self.coordinator.discover(&request).await;
        let classified = self
            .classifier
            .classify_impact(&discovered_impact, &request);
        debug!(
            "classified {} files into {} layers",
            classified.files.len(),
            classified.areas.iter().filter(|(_, f)| !f.is_empty()).count()
        );

        let token_budget = request
            .max_context_tokens
            .filter(|tokens| *tokens > 0)
            .unwrap_or(self.config.planning.default_token_budget);
        let graph = self
            .builder
            .build_with_budget(&classified, &request.query, token_budget)?;
        let execution_plan = self.planner.plan(&graph);

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "planned '{}': {} files, {} tasks, {} waves, about {} ({} ms)",
            request.query,
            discovered_impact.files.len(),
            execution_plan.total_tasks,
            execution_plan.waves.len(),
            execution_plan.estimated_duration,
            processing_time_ms
        );

        Ok(OrchestrationResult {
            project_id: request.project_id,
            processing_strategy: discovered_impact.processing_strategy,
            confidence: discovered_impact.confidence,
            discovered_impact,
            orchestrated_tasks: graph.into_tasks(),
            execution_plan,
            processing_time_ms,
            token_budget,
            generated_at: Utc::now(),
        })
    }

    /// Cascading impact of changing `changed_files` for `request`.
    pub async fn analyze_complete_impact(
        &self,
        project_path: &Path,
        request: &str,
        changed_files: &[String],
    ) -> Result<ImpactAnalysisResult> {
        self.check_project(project_path).await?;
        self.initialize().await?;
        Ok(self.impact.analyze(project_path, request, changed_files).await)
    }

    async fn check_project(&self, requested: &Path) -> Result<()> {
        let Some(bound) = self.project_root.as_deref() else {
            return Ok(());
        };
        if same_project(bound, requested).await {
            return Ok(());
        }
        Err(OrchestrationError::ProjectMismatch {
            bound: bound.to_path_buf(),
            requested: requested.to_path_buf(),
        })
    }

    fn prepare(&self, mut request: OrchestrationRequest) -> OrchestrationRequest {
        if request.project_id.trim().is_empty() {
            request.project_id = project_id(&request.project_path);
        }
        request
    }
}
