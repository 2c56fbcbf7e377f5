use std::collections::{HashMap, HashSet};

use ledecouverte::{ChangeKind, OrchestrationRequest, DEFAULT_TOKEN_BUDGET};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::ClassifiedImpact;
use crate::error::{PlanningError, Result};
use crate::layer::ImpactLayer;

/// Estimated tokens per target file.
pub const DEFAULT_TOKENS_PER_FILE: usize = 200;

/// What the execution engine should do with a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Create a new file.
    Create,
    /// Edit in place.
    Modify,
    /// Remove.
    Delete,
    /// Move.
    Rename,
}

impl Default for FileAction {
    fn default() -> Self {
        Self::Modify
    }
}

impl From<ChangeKind> for FileAction {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Create => Self::Create,
            ChangeKind::Update => Self::Modify,
            ChangeKind::Delete => Self::Delete,
            ChangeKind::Rename => Self::Rename,
        }
    }
}

/// One target file of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskFile {
    /// Project-relative path.
    pub path: String,
    /// Action.
    pub action: FileAction,
    /// Files the execution engine should load alongside. Filled downstream.
    pub required_context: Vec<String>,
}

/// A unit of work covering the files of one layer (or one chunk of it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrchestrationTask {
    /// Stable id derived from the layer slug.
    pub id: String,
    /// Short title.
    pub title: String,
    /// What the task is about.
    pub description: String,
    /// Layer.
    pub category: ImpactLayer,
    /// Priority (1-10).
    pub priority: u8,
    /// Estimated token cost, never above the budget.
    pub estimated_tokens: usize,
    /// Prerequisite task ids.
    pub dependencies: Vec<String>,
    /// Target files.
    pub files: Vec<TaskFile>,
}

/// Validated, acyclic task set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskGraph {
    tasks: Vec<OrchestrationTask>,
}

impl TaskGraph {
    /// Validate and wrap a task set.
    ///
    /// Fails on duplicate ids, dangling dependencies and cycles.
    pub fn new(tasks: Vec<OrchestrationTask>) -> Result<Self> {
        let mut graph = DiGraph::<usize, ()>::with_capacity(tasks.len(), tasks.len());
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(tasks.len());

        for (position, task) in tasks.iter().enumerate() {
            let node = graph.add_node(position);
            if nodes.insert(task.id.as_str(), node).is_some() {
                return Err(PlanningError::DuplicateTask {
                    id: task.id.clone(),
                });
            }
        }

        for task in &tasks {
            let to = nodes[task.id.as_str()];
            for dependency in &task.dependencies {
                let from = nodes.get(dependency.as_str()).copied().ok_or_else(|| {
                    PlanningError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                graph.add_edge(from, to, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(PlanningError::Cycle {
                task: tasks[graph[cycle.node_id()]].id.clone(),
            });
        }

        Ok(Self { tasks })
    }

    /// Tasks in build order.
    pub fn tasks(&self) -> &[OrchestrationTask] {
        &self.tasks
    }

    /// Task by id.
    pub fn get(&self, id: &str) -> Option<&OrchestrationTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Unwrap the task list.
    pub fn into_tasks(self) -> Vec<OrchestrationTask> {
        self.tasks
    }
}

/// Turns per-layer file groups into budget-bounded tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskGraphBuilder {
    /// Estimated tokens per target file.
    pub tokens_per_file: usize,
    /// Split a layer whose estimate exceeds the budget into several tasks.
    pub split_oversized_layers: bool,
}

impl Default for TaskGraphBuilder {
    fn default() -> Self {
        Self {
            tokens_per_file: DEFAULT_TOKENS_PER_FILE,
            split_oversized_layers: true,
        }
    }
}

impl TaskGraphBuilder {
    /// Builder with explicit settings.
    pub fn new(tokens_per_file: usize, split_oversized_layers: bool) -> Self {
        Self {
            tokens_per_file,
            split_oversized_layers,
        }
    }

    /// Maximum files per task under `budget`.
    pub fn files_per_task(&self, budget: usize) -> usize {
        (budget / self.tokens_per_file.max(1)).max(1)
    }

    /// Build the task graph for a classified impact.
    pub fn build(
        &self,
        classified: &ClassifiedImpact,
        request: &OrchestrationRequest,
    ) -> Result<TaskGraph> {
        self.build_with_budget(classified, &request.query, request.token_budget())
    }

    /// Build with an explicit budget. A zero budget means the default.
    pub fn build_with_budget(
        &self,
        classified: &ClassifiedImpact,
        query: &str,
        token_budget: usize,
    ) -> Result<TaskGraph> {
        let budget = if token_budget == 0 {
            DEFAULT_TOKEN_BUDGET
        } else {
            token_budget
        };
        let mut tasks = Vec::new();
        let mut layer_tasks: HashMap<ImpactLayer, Vec<String>> = HashMap::new();

        for (layer, files) in classified.areas.iter() {
            let chunks: Vec<&[String]> = if self.split_oversized_layers {
                files.chunks(self.files_per_task(budget)).collect()
            } else {
                vec![files]
            };

            let dependencies: Vec<String> = layer
                .spec()
                .depends_on
                .iter()
                .filter_map(|dependency| layer_tasks.get(dependency))
                .flatten()
                .cloned()
                .collect();

            let total = chunks.len();
            let mut ids = Vec::with_capacity(total);
            for (index, chunk) in chunks.into_iter().enumerate() {
                let task = self.task(
                    layer,
                    index,
                    total,
                    chunk,
                    classified,
                    query,
                    budget,
                    dependencies.clone(),
                );
                ids.push(task.id.clone());
                tasks.push(task);
            }
            layer_tasks.insert(layer, ids);
        }

        debug!(
            "built {} tasks across {} layers (budget {})",
            tasks.len(),
            layer_tasks.len(),
            budget
        );
        TaskGraph::new(tasks)
    }

    #[allow(clippy::too_many_arguments)]
    fn task(
        &self,
        layer: ImpactLayer,
        index: usize,
        total: usize,
        files: &[String],
        classified: &ClassifiedImpact,
        query: &str,
        budget: usize,
        dependencies: Vec<String>,
    ) -> OrchestrationTask {
        let id = task_id(layer, index);
        let title = if total > 1 {
            format!("{} (part {}/{})", layer.title(), index + 1, total)
        } else {
            layer.title().to_string()
        };
        let estimated_tokens = files
            .len()
            .saturating_mul(self.tokens_per_file)
            .min(budget);

        let mut seen = HashSet::new();
        let targets = files
            .iter()
            .filter(|path| seen.insert(path.as_str()))
            .map(|path| TaskFile {
                path: path.clone(),
                action: classified
                    .file(path)
                    .map(|f| FileAction::from(f.change_kind))
                    .unwrap_or_default(),
                required_context: Vec::new(),
            })
            .collect();

        OrchestrationTask {
            id,
            title,
            description: format!(
                "{} changes across {} file(s) for: {}",
                layer.title(),
                files.len(),
                query
            ),
            category: layer,
            priority: layer.priority(),
            estimated_tokens,
            dependencies,
            files: targets,
        }
    }
}

/// Id of the `index`-th (0-based) task of a layer.
pub fn task_id(layer: ImpactLayer, index: usize) -> String {
    if index == 0 {
        format!("{}-task", layer.slug())
    } else {
        format!("{}-task-{}", layer.slug(), index + 1)
    }
}
