// ledecouverte - Impact Discovery
//
// *La Découverte* (The Discovery) - Semantic, relationship and structural discovery of the files a change request touches

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Three-phase discovery coordinator.
pub mod coordinator;
/// Discovery output model.
pub mod impact;
/// Request and affected-file model.
pub mod model;
/// Path normalization helpers.
pub mod paths;
/// External provider contracts.
pub mod providers;

pub use coordinator::{DiscoveryConfig, DiscoveryCoordinator};
pub use impact::{
    CodeElement, Confidence, DiscoveredFile, DiscoveredImpact, DiscoveryOrigin, DiscoveryPhase,
    ElementKind, GraphNode, ImpactLevel, PhaseOutcome, PhaseReport, ProcessingStrategy,
    RelatedFile, RelationshipType, ScoredFile, EXPANSION_RELATIONSHIPS,
};
pub use model::{
    clamp_complexity, AffectedFile, ChangeKind, FileKind, Intent, OrchestrationRequest, Priority,
    DEFAULT_TOKEN_BUDGET,
};
pub use providers::{
    DiscoveryQuery, FileDiscovery, FileDiscoveryProvider, GraphService, StructuralAnalysis,
    StructuralAnalyzer, StructuralFile,
};

pub use lesuperviseur::CancellationToken;

/// Discovery library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
