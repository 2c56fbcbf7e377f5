use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Token budget used when a request does not carry one.
pub const DEFAULT_TOKEN_BUDGET: usize = 8_000;

/// Query length above which a request is considered detailed.
pub const DETAILED_REQUEST_CHARS: usize = 100;

/// Coarse intent of a change request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Locate code.
    Search,
    /// Restructure code.
    Refactor,
    /// Track down a defect.
    Debug,
    /// Improve performance.
    Optimize,
    /// Harden or audit.
    Security,
    /// Add or fix tests.
    Test,
}

impl Default for Intent {
    fn default() -> Self {
        Self::Search
    }
}

impl Intent {
    /// Every intent in declaration order.
    pub const ALL: [Intent; 6] = [
        Self::Search,
        Self::Refactor,
        Self::Debug,
        Self::Optimize,
        Self::Security,
        Self::Test,
    ];

    /// Parse intent from CLI string.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "search" => Some(Self::Search),
            "refactor" => Some(Self::Refactor),
            "debug" => Some(Self::Debug),
            "optimize" | "optimise" => Some(Self::Optimize),
            "security" => Some(Self::Security),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    /// Lower-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Refactor => "refactor",
            Self::Debug => "debug",
            Self::Optimize => "optimize",
            Self::Security => "security",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of one orchestration call. Built once, never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    /// Free-text change request.
    pub query: String,
    /// Coarse intent tag.
    pub intent: Intent,
    /// Project root.
    pub project_path: PathBuf,
    /// Project identifier.
    pub project_id: String,
    /// Optional per-task token ceiling.
    #[serde(default)]
    pub max_context_tokens: Option<usize>,
}

impl OrchestrationRequest {
    /// Create a request with the default token budget.
    pub fn new(
        query: impl Into<String>,
        intent: Intent,
        project_path: impl Into<PathBuf>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            intent,
            project_path: project_path.into(),
            project_id: project_id.into(),
            max_context_tokens: None,
        }
    }

    /// Set an explicit token budget.
    #[must_use]
    pub fn with_token_budget(mut self, tokens: usize) -> Self {
        self.max_context_tokens = Some(tokens);
        self
    }

    /// Effective token budget; zero or missing falls back to [`DEFAULT_TOKEN_BUDGET`].
    pub fn token_budget(&self) -> usize {
        self.max_context_tokens
            .filter(|tokens| *tokens > 0)
            .unwrap_or(DEFAULT_TOKEN_BUDGET)
    }

    /// True if the query text exceeds [`DETAILED_REQUEST_CHARS`].
    pub fn is_detailed(&self) -> bool {
        self.query.chars().count() > DETAILED_REQUEST_CHARS
    }
}

/// What kind of artifact a file is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Source code.
    Code,
    /// Configuration.
    Config,
    /// Documentation.
    Documentation,
    /// Tests.
    Test,
    /// Deployment and infrastructure.
    Deployment,
    /// Static assets.
    Static,
}

/// How a file is expected to change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// New file.
    Create,
    /// Existing file edited in place.
    Update,
    /// File removed.
    Delete,
    /// File moved.
    Rename,
}

impl Default for ChangeKind {
    fn default() -> Self {
        Self::Update
    }
}

/// Priority of an affected file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to have.
    Low = 0,
    /// Should be handled.
    Medium = 1,
    /// Must be handled.
    High = 2,
    /// Must be handled first.
    Critical = 3,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// One file implicated by a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedFile {
    /// Project-relative path.
    pub file_path: String,
    /// Artifact kind.
    pub file_kind: FileKind,
    /// Expected change.
    pub change_kind: ChangeKind,
    /// What needs to happen to this file.
    pub task_description: String,
    /// Priority.
    pub priority: Priority,
    /// Paths this file depends on. Only paths that are themselves affected.
    pub dependencies: Vec<String>,
    /// Complexity score in `1..=10`.
    pub complexity: u8,
}

impl AffectedFile {
    /// Lowest complexity score.
    pub const MIN_COMPLEXITY: u8 = 1;
    /// Highest complexity score.
    pub const MAX_COMPLEXITY: u8 = 10;

    /// Create an entry with medium priority, no dependencies and minimal complexity.
    pub fn new(
        file_path: impl Into<String>,
        file_kind: FileKind,
        change_kind: ChangeKind,
        task_description: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            file_kind,
            change_kind,
            task_description: task_description.into(),
            priority: Priority::default(),
            dependencies: Vec::new(),
            complexity: Self::MIN_COMPLEXITY,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the complexity, clamped to `1..=10`.
    #[must_use]
    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = clamp_complexity(complexity);
        self
    }

    /// Set the dependency list.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Clamp a raw score into the `1..=10` complexity range.
pub fn clamp_complexity(raw: u32) -> u8 {
    raw.clamp(
        u32::from(AffectedFile::MIN_COMPLEXITY),
        u32::from(AffectedFile::MAX_COMPLEXITY),
    ) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("search", Some(Intent::Search))]
    #[case("REFACTOR", Some(Intent::Refactor))]
    #[case(" debug ", Some(Intent::Debug))]
    #[case("optimise", Some(Intent::Optimize))]
    #[case("security", Some(Intent::Security))]
    #[case("test", Some(Intent::Test))]
    #[case("deploy", None)]
    fn intent_parse(#[case] raw: &str, #[case] expected: Option<Intent>) {
        assert_eq!(Intent::parse(raw), expected);
    }

    #[test]
    fn intent_serializes_lowercase() {
        let json = serde_json::to_string(&Intent::Optimize).expect("serialize");
        assert_eq!(json, "\"optimize\"");
        for intent in Intent::ALL {
            assert_eq!(Intent::parse(&intent.to_string()), Some(intent));
        }
    }

    #[test]
    fn token_budget_defaults_to_8000() {
        let request = OrchestrationRequest::new("q", Intent::Search, "/tmp/p", "p");
        assert_eq!(request.token_budget(), DEFAULT_TOKEN_BUDGET);
        assert_eq!(request.clone().with_token_budget(0).token_budget(), 8_000);
        assert_eq!(request.with_token_budget(4_000).token_budget(), 4_000);
    }

    #[test]
    fn detailed_request_threshold() {
        let short = OrchestrationRequest::new("a".repeat(100), Intent::Search, ".", "p");
        let long = OrchestrationRequest::new("a".repeat(101), Intent::Search, ".", "p");
        assert!(!short.is_detailed());
        assert!(long.is_detailed());
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(7, 7)]
    #[case(10, 10)]
    #[case(42, 10)]
    fn complexity_is_clamped(#[case] raw: u32, #[case] expected: u8) {
        let file = AffectedFile::new("src/a.rs", FileKind::Code, ChangeKind::Update, "x")
            .with_complexity(raw);
        assert_eq!(file.complexity, expected);
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::Critical.to_string(), "critical");
    }
}
