use crate::model::{ChangeKind, Intent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A file returned by the semantic discovery provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredFile {
    /// Path as reported by the provider.
    pub file_path: String,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f32,
    /// Change already known to the provider (create/delete), if any.
    #[serde(default)]
    pub change_kind: Option<ChangeKind>,
}

impl ScoredFile {
    /// Create an entry, clamping the score into `[0, 1]`.
    pub fn new(file_path: impl Into<String>, relevance_score: f32) -> Self {
        let score = if relevance_score.is_finite() {
            relevance_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            file_path: file_path.into(),
            relevance_score: score,
            change_kind: None,
        }
    }

    /// Attach a known change kind.
    #[must_use]
    pub fn with_change(mut self, change_kind: ChangeKind) -> Self {
        self.change_kind = Some(change_kind);
        self
    }
}

/// Relationship types a graph service may report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Module import.
    Imports,
    /// Generic dependency.
    DependsOn,
    /// Usage of a symbol.
    Uses,
    /// Interface implementation.
    Implements,
    /// Test coverage.
    Tests,
    /// Symbol definition.
    Defines,
    /// Documentation.
    Describes,
    /// Function call.
    Calls,
    /// Containment (file contains symbol).
    Contains,
}

/// Relationship types followed during relationship expansion.
pub const EXPANSION_RELATIONSHIPS: [RelationshipType; 7] = [
    RelationshipType::Imports,
    RelationshipType::DependsOn,
    RelationshipType::Uses,
    RelationshipType::Implements,
    RelationshipType::Tests,
    RelationshipType::Defines,
    RelationshipType::Describes,
];

impl RelationshipType {
    /// Parse from a graph-service label (`IMPORTS`, `depends-on`, `depends_on`...).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "imports" | "import" => Some(Self::Imports),
            "depends_on" | "dependency" => Some(Self::DependsOn),
            "uses" => Some(Self::Uses),
            "implements" => Some(Self::Implements),
            "tests" => Some(Self::Tests),
            "defines" => Some(Self::Defines),
            "describes" => Some(Self::Describes),
            "calls" | "call" => Some(Self::Calls),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    /// Snake-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::DependsOn => "depends_on",
            Self::Uses => "uses",
            Self::Implements => "implements",
            Self::Tests => "tests",
            Self::Defines => "defines",
            Self::Describes => "describes",
            Self::Calls => "calls",
            Self::Contains => "contains",
        }
    }

    /// True if relationship expansion follows this type.
    pub fn is_expandable(self) -> bool {
        EXPANSION_RELATIONSHIPS.contains(&self)
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a related file sits from the file that surfaced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    /// Depth 1.
    Direct,
    /// Depth 2.
    Indirect,
    /// Depth 3 and beyond.
    Cascading,
}

impl ImpactLevel {
    /// Derive the level from a traversal depth.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 | 1 => Self::Direct,
            2 => Self::Indirect,
            _ => Self::Cascading,
        }
    }
}

/// A node returned by the graph service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Graph-local identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// File the node belongs to, if it maps to one.
    pub file_path: Option<String>,
    /// Relationship through which the node was reached.
    #[serde(default)]
    pub relationship: Option<RelationshipType>,
    /// Traversal depth at which the node was reached.
    #[serde(default)]
    pub depth: Option<usize>,
}

/// A file reached through relationship expansion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedFile {
    /// Project-relative path.
    pub file_path: String,
    /// File whose expansion surfaced this one.
    pub source_file: String,
    /// Relationship of the reaching edge, when the graph reports one.
    pub relationship: Option<RelationshipType>,
    /// Traversal depth (1-based).
    pub depth: usize,
    /// Level derived from `depth`.
    pub impact_level: ImpactLevel,
}

/// Kind of a structural code element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Class, struct or enum.
    Class,
    /// Function or method.
    Function,
    /// Interface, trait or protocol.
    Interface,
}

/// A code element found inside a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeElement {
    /// Symbol name.
    pub name: String,
    /// Element kind.
    pub kind: ElementKind,
    /// Containing file.
    pub file_path: String,
    /// 1-indexed line of the declaration.
    pub line: usize,
}

/// Phase that first reported a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryOrigin {
    /// Semantic primary list.
    Semantic,
    /// Semantic related list.
    SemanticRelated,
    /// Relationship expansion.
    Relationship,
}

/// One file in the merged, deduplicated candidate set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredFile {
    /// Project-relative path.
    pub file_path: String,
    /// Phase that supplied the kept metadata.
    pub origin: DiscoveryOrigin,
    /// Semantic relevance.
    pub relevance_score: Option<f32>,
    /// Change already flagged by discovery.
    pub change_kind: Option<ChangeKind>,
    /// File whose expansion surfaced this one.
    pub source_file: Option<String>,
    /// Relationship of the reaching edge.
    pub relationship: Option<RelationshipType>,
    /// Impact level of the reaching edge.
    pub impact_level: Option<ImpactLevel>,
    /// Structural elements found in the file.
    pub elements: Vec<CodeElement>,
}

impl DiscoveredFile {
    /// Candidate from a semantic hit.
    pub fn from_scored(file_path: String, scored: &ScoredFile, origin: DiscoveryOrigin) -> Self {
        Self {
            file_path,
            origin,
            relevance_score: Some(scored.relevance_score),
            change_kind: scored.change_kind,
            source_file: None,
            relationship: None,
            impact_level: None,
            elements: Vec::new(),
        }
    }

    /// Candidate from a relationship edge.
    pub fn from_related(related: &RelatedFile) -> Self {
        Self {
            file_path: related.file_path.clone(),
            origin: DiscoveryOrigin::Relationship,
            relevance_score: None,
            change_kind: None,
            source_file: Some(related.source_file.clone()),
            relationship: related.relationship,
            impact_level: Some(related.impact_level),
            elements: Vec::new(),
        }
    }

    /// Number of populated metadata fields.
    pub fn richness(&self) -> usize {
        [
            self.relevance_score.is_some(),
            self.change_kind.is_some(),
            self.source_file.is_some(),
            self.relationship.is_some(),
            self.impact_level.is_some(),
            !self.elements.is_empty(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Keep the richer of two metadata sets for the same path.
    ///
    /// Equal richness keeps the higher relevance score, then `self`.
    pub fn merge(self, other: DiscoveredFile) -> DiscoveredFile {
        let (mine, theirs) = (self.richness(), other.richness());
        if theirs > mine {
            return other;
        }
        if theirs == mine
            && other.relevance_score.unwrap_or(0.0) > self.relevance_score.unwrap_or(0.0)
        {
            return other;
        }
        self
    }
}

/// Pipeline confidence in the discovery result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Primary provider answered.
    High,
    /// Primary provider failed; a degraded substitute was used.
    Low,
}

/// Discovery phases in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPhase {
    /// Semantic file discovery.
    Semantic,
    /// Graph relationship expansion.
    RelationshipExpansion,
    /// Structural element extraction.
    Structural,
}

/// How a phase ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// Every operation succeeded.
    Completed,
    /// Some per-file operations fell back.
    Degraded,
    /// The whole phase fell back.
    Fallback,
}

/// Per-phase observability record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseReport {
    /// Phase.
    pub phase: DiscoveryPhase,
    /// Outcome.
    pub outcome: PhaseOutcome,
    /// Supervised operations issued.
    pub operations: usize,
    /// Operations that fell back.
    pub failures: usize,
    /// Wall-clock time.
    pub elapsed_ms: u64,
}

impl PhaseReport {
    /// Build a report, deriving the outcome from the failure count.
    pub fn from_counts(
        phase: DiscoveryPhase,
        operations: usize,
        failures: usize,
        elapsed_ms: u64,
    ) -> Self {
        let outcome = if failures == 0 {
            PhaseOutcome::Completed
        } else if failures < operations {
            PhaseOutcome::Degraded
        } else {
            PhaseOutcome::Fallback
        };
        Self {
            phase,
            outcome,
            operations,
            failures,
            elapsed_ms,
        }
    }
}

/// Overall processing strategy that produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStrategy {
    /// All phases completed.
    FullDiscovery,
    /// At least one phase degraded or fell back, semantic discovery succeeded.
    PartialDiscovery,
    /// Semantic discovery fell back.
    Fallback,
}

impl ProcessingStrategy {
    /// Derive the strategy from phase reports.
    pub fn from_phases(phases: &[PhaseReport]) -> Self {
        let semantic_failed = phases.iter().any(|p| {
            p.phase == DiscoveryPhase::Semantic && p.outcome == PhaseOutcome::Fallback
        });
        if semantic_failed {
            Self::Fallback
        } else if phases.iter().all(|p| p.outcome == PhaseOutcome::Completed) {
            Self::FullDiscovery
        } else {
            Self::PartialDiscovery
        }
    }
}

/// Best-effort impact model produced by discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredImpact {
    /// Query text.
    pub query: String,
    /// Intent.
    pub intent: Intent,
    /// Primary semantic hits.
    pub semantic_files: Vec<ScoredFile>,
    /// Related semantic hits.
    pub related_files: Vec<ScoredFile>,
    /// Every relationship edge accumulated during expansion.
    pub relationship_files: Vec<RelatedFile>,
    /// Code elements keyed by file path.
    pub code_elements: BTreeMap<String, Vec<CodeElement>>,
    /// Deduplicated union of all phases, in discovery order.
    pub files: Vec<DiscoveredFile>,
    /// Confidence flag.
    pub confidence: Confidence,
    /// Processing strategy.
    pub processing_strategy: ProcessingStrategy,
    /// Per-phase reports.
    pub phases: Vec<PhaseReport>,
}

impl DiscoveredImpact {
    /// Paths of all discovered files, in discovery order.
    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_path.clone()).collect()
    }

    /// Look up a discovered file by path.
    pub fn find(&self, path: &str) -> Option<&DiscoveredFile> {
        self.files.iter().find(|f| f.file_path == path)
    }

    /// True if nothing was discovered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Report for one phase.
    pub fn phase(&self, phase: DiscoveryPhase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, ImpactLevel::Direct)]
    #[case(2, ImpactLevel::Indirect)]
    #[case(3, ImpactLevel::Cascading)]
    #[case(7, ImpactLevel::Cascading)]
    fn impact_level_from_depth(#[case] depth: usize, #[case] expected: ImpactLevel) {
        assert_eq!(ImpactLevel::from_depth(depth), expected);
    }

    #[rstest]
    #[case("IMPORTS", Some(RelationshipType::Imports))]
    #[case("depends-on", Some(RelationshipType::DependsOn))]
    #[case("DEPENDS_ON", Some(RelationshipType::DependsOn))]
    #[case("calls", Some(RelationshipType::Calls))]
    #[case("owns", None)]
    fn relationship_parse(#[case] raw: &str, #[case] expected: Option<RelationshipType>) {
        assert_eq!(RelationshipType::parse(raw), expected);
    }

    #[test]
    fn expansion_allow_list_excludes_calls_and_contains() {
        assert!(RelationshipType::Tests.is_expandable());
        assert!(!RelationshipType::Calls.is_expandable());
        assert!(!RelationshipType::Contains.is_expandable());
    }

    #[test]
    fn scored_file_clamps_relevance() {
        assert_eq!(ScoredFile::new("a", 1.7).relevance_score, 1.0);
        assert_eq!(ScoredFile::new("a", -0.2).relevance_score, 0.0);
        assert_eq!(ScoredFile::new("a", f32::NAN).relevance_score, 0.0);
    }

    #[test]
    fn merge_keeps_richer_metadata() {
        let semantic = DiscoveredFile::from_scored(
            "src/a.ts".to_string(),
            &ScoredFile::new("src/a.ts", 0.9),
            DiscoveryOrigin::Semantic,
        );
        let related = DiscoveredFile::from_related(&RelatedFile {
            file_path: "src/a.ts".to_string(),
            source_file: "src/b.ts".to_string(),
            relationship: Some(RelationshipType::Imports),
            depth: 1,
            impact_level: ImpactLevel::Direct,
        });

        let merged = semantic.clone().merge(related.clone());
        assert_eq!(merged.origin, DiscoveryOrigin::Relationship);

        let merged = related.merge(semantic);
        assert_eq!(merged.origin, DiscoveryOrigin::Relationship);
    }

    #[test]
    fn merge_tie_prefers_higher_relevance() {
        let low = DiscoveredFile::from_scored(
            "a".to_string(),
            &ScoredFile::new("a", 0.2),
            DiscoveryOrigin::Semantic,
        );
        let high = DiscoveredFile::from_scored(
            "a".to_string(),
            &ScoredFile::new("a", 0.8),
            DiscoveryOrigin::SemanticRelated,
        );
        assert_eq!(low.merge(high).relevance_score, Some(0.8));
    }

    #[test]
    fn phase_report_outcomes() {
        let done = PhaseReport::from_counts(DiscoveryPhase::Structural, 3, 0, 1);
        let partial = PhaseReport::from_counts(DiscoveryPhase::Structural, 3, 1, 1);
        let failed = PhaseReport::from_counts(DiscoveryPhase::Structural, 3, 3, 1);
        let nothing = PhaseReport::from_counts(DiscoveryPhase::Structural, 0, 0, 1);
        assert_eq!(done.outcome, PhaseOutcome::Completed);
        assert_eq!(partial.outcome, PhaseOutcome::Degraded);
        assert_eq!(failed.outcome, PhaseOutcome::Fallback);
        assert_eq!(nothing.outcome, PhaseOutcome::Completed);
    }

    #[test]
    fn strategy_from_phases() {
        let ok = |phase| PhaseReport::from_counts(phase, 1, 0, 0);
        let bad = |phase| PhaseReport::from_counts(phase, 1, 1, 0);

        assert_eq!(
            ProcessingStrategy::from_phases(&[
                ok(DiscoveryPhase::Semantic),
                ok(DiscoveryPhase::RelationshipExpansion),
                ok(DiscoveryPhase::Structural),
            ]),
            ProcessingStrategy::FullDiscovery
        );
        assert_eq!(
            ProcessingStrategy::from_phases(&[
                ok(DiscoveryPhase::Semantic),
                bad(DiscoveryPhase::Structural),
            ]),
            ProcessingStrategy::PartialDiscovery
        );
        assert_eq!(
            ProcessingStrategy::from_phases(&[bad(DiscoveryPhase::Semantic)]),
            ProcessingStrategy::Fallback
        );
    }
}
