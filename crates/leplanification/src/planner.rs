use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::taskgraph::{OrchestrationTask, TaskGraph};

/// Minutes of work assumed per task (or per file in impact analysis).
pub const MINUTES_PER_UNIT: f64 = 2.0;

/// Derived schedule over a finalized task set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Number of tasks.
    pub total_tasks: usize,
    /// Human-readable estimate, e.g. `"4 minutes"`.
    pub estimated_duration: String,
    /// Groups of tasks that may run concurrently. Only tasks without dependencies.
    pub parallel_groups: Vec<Vec<String>>,
    /// Every task in a safe one-at-a-time order.
    pub sequential_order: Vec<String>,
    /// Topological layering: each task's dependencies sit in earlier waves.
    pub waves: Vec<Vec<String>>,
}

impl ExecutionPlan {
    /// True if there is nothing to schedule.
    pub fn is_empty(&self) -> bool {
        self.total_tasks == 0
    }
}

/// Computes execution plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    /// Create a planner.
    pub fn new() -> Self {
        Self
    }

    /// Plan a validated task graph.
    pub fn plan(&self, graph: &TaskGraph) -> ExecutionPlan {
        let tasks = graph.tasks();

        let roots: Vec<String> = tasks
            .iter()
            .filter(|t| t.dependencies.is_empty())
            .map(|t| t.id.clone())
            .collect();
        let parallel_groups = if roots.is_empty() {
            Vec::new()
        } else {
            vec![roots]
        };

        let plan = ExecutionPlan {
            total_tasks: tasks.len(),
            estimated_duration: estimate_duration(tasks.len()),
            parallel_groups,
            sequential_order: sequential_order(tasks),
            waves: waves(tasks),
        };

        info!(
            "execution plan: {} tasks, {} waves, {}",
            plan.total_tasks,
            plan.waves.len(),
            plan.estimated_duration
        );
        plan
    }
}

/// Duration estimate for `units` units of work.
pub fn estimate_duration(units: usize) -> String {
    let minutes = (units as f64 * MINUTES_PER_UNIT).ceil() as u64;
    format!("{minutes} minutes")
}

struct Kahn<'a> {
    tasks: &'a [OrchestrationTask],
    pending: Vec<usize>,
    dependents: Vec<Vec<usize>>,
}

impl<'a> Kahn<'a> {
    fn new(tasks: &'a [OrchestrationTask]) -> Self {
        let positions: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let mut pending = vec![0; tasks.len()];
        let mut dependents = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for dependency in &task.dependencies {
                if let Some(&from) = positions.get(dependency.as_str()) {
                    pending[i] += 1;
                    dependents[from].push(i);
                }
            }
        }
        Self {
            tasks,
            pending,
            dependents,
        }
    }

    fn key(&self, i: usize) -> (u8, Reverse<usize>) {
        (self.tasks[i].priority, Reverse(i))
    }

    fn ready(&self) -> Vec<usize> {
        (0..self.tasks.len())
            .filter(|i| self.pending[*i] == 0)
            .collect()
    }

    /// Mark `i` done, returning tasks that became ready.
    fn complete(&mut self, i: usize) -> Vec<usize> {
        let mut released = Vec::new();
        for &next in &self.dependents[i] {
            self.pending[next] -= 1;
            if self.pending[next] == 0 {
                released.push(next);
            }
        }
        released
    }
}

/// Topological order, ties broken by descending priority then build order.
fn sequential_order(tasks: &[OrchestrationTask]) -> Vec<String> {
    let mut kahn = Kahn::new(tasks);
    let mut heap: BinaryHeap<_> = kahn.ready().into_iter().map(|i| (kahn.key(i), i)).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while let Some((_, i)) = heap.pop() {
        order.push(tasks[i].id.clone());
        for next in kahn.complete(i) {
            heap.push((kahn.key(next), next));
        }
    }
    order
}

fn waves(tasks: &[OrchestrationTask]) -> Vec<Vec<String>> {
    let mut kahn = Kahn::new(tasks);
    let mut current = kahn.ready();
    let mut waves = Vec::new();

    while !current.is_empty() {
        current.sort_by_key(|i| Reverse(kahn.key(*i)));
        let mut next = Vec::new();
        for &i in &current {
            next.extend(kahn.complete(i));
        }
        waves.push(current.iter().map(|i| tasks[*i].id.clone()).collect());
        current = next;
    }
    waves
}
