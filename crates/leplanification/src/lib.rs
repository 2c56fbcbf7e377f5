// leplanification - Impact Planning
//
// *La Planification* (The Planning) - Layer classification, task graph construction and execution planning

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Path-based layer classification.
pub mod classify;
/// Planning errors.
pub mod error;
/// Cascading impact analysis.
pub mod impact;
/// Impact layers and their static planning table.
pub mod layer;
/// Execution planning.
pub mod planner;
/// Risk classification.
pub mod risk;
/// Task graph construction.
pub mod taskgraph;

pub use classify::{
    complexity_for, ClassificationRule, ClassifiedImpact, ImpactAreas, ImpactClassifier, Matcher,
    DEFAULT_RULES,
};
pub use error::PlanningError;
pub use impact::{
    cascade_priority, test_counterpart, ImpactAnalysisConfig, ImpactAnalysisResult,
    ImpactAnalyzer, KeywordTrigger, CONFIG_TRIGGER, DEPLOYMENT_TRIGGER, DOCUMENTATION_TRIGGER,
    TEST_TRIGGER,
};
pub use layer::{ImpactLayer, LayerSpec, LAYER_TABLE};
pub use planner::{estimate_duration, ExecutionPlan, ExecutionPlanner};
pub use risk::{RiskFactors, RiskLevel};
pub use taskgraph::{
    task_id, FileAction, OrchestrationTask, TaskFile, TaskGraph, TaskGraphBuilder,
    DEFAULT_TOKENS_PER_FILE,
};

/// Planning library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
