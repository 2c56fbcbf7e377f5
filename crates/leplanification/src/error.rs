use thiserror::Error;

/// Task-graph defects.
///
/// The builder only wires dependencies against layers that produced a task, so
/// any of these indicates a bug in graph construction rather than bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    /// A task lists a prerequisite that is not in the task set.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// Task holding the dangling reference.
        task: String,
        /// Missing prerequisite id.
        dependency: String,
    },

    /// Two tasks share an id.
    #[error("duplicate task id '{id}'")]
    DuplicateTask {
        /// Repeated id.
        id: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle through task '{task}'")]
    Cycle {
        /// A task on the cycle.
        task: String,
    },
}

/// Result alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;
