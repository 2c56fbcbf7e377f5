//! Cascading impact analysis for an explicit list of changed files.
//!
//! Primary files come from the caller plus paths named in the request text.
//! Cascading files are found by walking the graph service outward from every
//! primary file. Configuration, documentation, test and deployment impacts
//! are detected from trigger keywords in the request.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use ledecouverte::paths::{normalize_path, same_file};
use ledecouverte::{
    AffectedFile, CancellationToken, ChangeKind, FileKind, GraphService, Priority,
    RelationshipType, EXPANSION_RELATIONSHIPS,
};
use lesuperviseur::{OrchestrationSupervisor, RetryPolicy};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::{complexity_for, ImpactClassifier};
use crate::layer::ImpactLayer;
use crate::planner::estimate_duration;
use crate::risk::{RiskFactors, RiskLevel};

static PATH_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:[A-Za-z0-9_.\-]+/)*[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*\.(?:ts|tsx|js|jsx|mjs|cjs|py|rs|go|java|kt|rb|php|cs|vue|svelte|json|toml|yaml|yml|md|sql|css|scss|html)\b",
    )
    .expect("path mention pattern is valid")
});

/// Keyword table that triggers one impact bucket.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTrigger {
    /// Layer whose files fill the bucket.
    pub layer: ImpactLayer,
    /// Trigger words, matched against request words.
    pub keywords: &'static [&'static str],
    /// Conventional file used when the graph knows no matching file.
    pub fallback: Option<&'static str>,
    /// Priority of files in the bucket.
    pub priority: Priority,
}

/// Configuration trigger table.
pub const CONFIG_TRIGGER: KeywordTrigger = KeywordTrigger {
    layer: ImpactLayer::ConfigLayer,
    keywords: &[
        "config",
        "configuration",
        "setting",
        "settings",
        "env",
        "environment",
        "variable",
        "secret",
        "port",
        "timeout",
    ],
    fallback: Some(".env.example"),
    priority: Priority::Medium,
};

/// Documentation trigger table.
pub const DOCUMENTATION_TRIGGER: KeywordTrigger = KeywordTrigger {
    layer: ImpactLayer::Documentation,
    keywords: &[
        "doc",
        "docs",
        "documentation",
        "readme",
        "guide",
        "changelog",
        "tutorial",
        "explain",
    ],
    fallback: Some("README.md"),
    priority: Priority::Low,
};

/// Test trigger table. Falls back to per-file test counterparts.
pub const TEST_TRIGGER: KeywordTrigger = KeywordTrigger {
    layer: ImpactLayer::TestLayer,
    keywords: &[
        "test",
        "tests",
        "testing",
        "spec",
        "coverage",
        "bug",
        "fix",
        "regression",
        "verify",
    ],
    fallback: None,
    priority: Priority::Medium,
};

/// Deployment trigger table.
pub const DEPLOYMENT_TRIGGER: KeywordTrigger = KeywordTrigger {
    layer: ImpactLayer::DeploymentLayer,
    keywords: &[
        "deploy",
        "deployment",
        "release",
        "docker",
        "kubernetes",
        "k8s",
        "ci",
        "pipeline",
        "production",
        "infrastructure",
        "helm",
    ],
    fallback: Some("Dockerfile"),
    priority: Priority::High,
};

impl KeywordTrigger {
    /// Trigger words present in `request`.
    ///
    /// A request word matches a keyword when equal to it, or, for keywords of
    /// four letters or more, when it starts with it (`deploying`, `configs`).
    pub fn matches(&self, request: &str) -> Vec<&'static str> {
        let words = request_words(request);
        self.keywords
            .iter()
            .copied()
            .filter(|keyword| {
                words
                    .iter()
                    .any(|w| w == keyword || (keyword.len() >= 4 && w.starts_with(keyword)))
            })
            .collect()
    }

    /// True if any trigger word is present.
    pub fn is_triggered(&self, request: &str) -> bool {
        !self.matches(request).is_empty()
    }
}

fn request_words(request: &str) -> Vec<String> {
    request
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of a cascading impact analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactAnalysisResult {
    /// Files the caller changes directly.
    pub primary_files: Vec<AffectedFile>,
    /// Dependents reached through the graph, one entry per file.
    pub cascading_files: Vec<AffectedFile>,
    /// Configuration impact.
    pub config_files: Vec<AffectedFile>,
    /// Documentation impact.
    pub documentation_files: Vec<AffectedFile>,
    /// Test impact.
    pub test_files: Vec<AffectedFile>,
    /// Deployment impact.
    pub deployment_files: Vec<AffectedFile>,
    /// Sum of all buckets.
    pub total_files: usize,
    /// Human-readable estimate.
    pub estimated_time: String,
    /// Risk classification.
    pub risk_level: RiskLevel,
}

impl ImpactAnalysisResult {
    /// Every affected file across buckets.
    pub fn all_files(&self) -> impl Iterator<Item = &AffectedFile> {
        self.primary_files
            .iter()
            .chain(&self.cascading_files)
            .chain(&self.config_files)
            .chain(&self.documentation_files)
            .chain(&self.test_files)
            .chain(&self.deployment_files)
    }
}

/// Tunables of the impact analyzer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImpactAnalysisConfig {
    /// Graph traversal depth.
    pub max_depth: usize,
    /// Width of the per-file worker pool.
    pub concurrency: usize,
    /// Policy for per-file graph queries.
    pub file_policy: RetryPolicy,
}

impl Default for ImpactAnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            concurrency: 8,
            file_policy: RetryPolicy::new(2, 10_000),
        }
    }
}

/// Priority of a dependent given how it was reached.
pub fn cascade_priority(relationship: Option<RelationshipType>, depth: usize) -> Priority {
    match relationship {
        Some(RelationshipType::Imports) if depth <= 1 => Priority::Critical,
        Some(RelationshipType::DependsOn) if depth <= 2 => Priority::High,
        _ if depth <= 3 => Priority::Medium,
        _ => Priority::Low,
    }
}

/// Conventional test file for a source path.
pub fn test_counterpart(path: &str) -> Option<String> {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (format!("{dir}/"), name),
        None => (String::new(), path),
    };
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(match ext {
        "py" => format!("{dir}test_{stem}.py"),
        "go" => format!("{dir}{stem}_test.go"),
        "rs" => format!("tests/{stem}.rs"),
        _ => format!("{dir}{stem}.test.{ext}"),
    })
}

#[derive(Debug, Clone)]
struct Cascade {
    path: String,
    source: String,
    relationship: Option<RelationshipType>,
    depth: usize,
    priority: Priority,
}

/// Cascading impact analysis over a graph service.
pub struct ImpactAnalyzer {
    graph: Arc<dyn GraphService>,
    supervisor: Arc<OrchestrationSupervisor>,
    classifier: ImpactClassifier,
    config: ImpactAnalysisConfig,
}

impl std::fmt::Debug for ImpactAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpactAnalyzer")
            .field("graph", &self.graph.name())
            .field("config", &self.config)
            .finish()
    }
}

impl ImpactAnalyzer {
    /// Analyzer with default tunables.
    pub fn new(graph: Arc<dyn GraphService>, supervisor: Arc<OrchestrationSupervisor>) -> Self {
        Self {
            graph,
            supervisor,
            classifier: ImpactClassifier::default(),
            config: ImpactAnalysisConfig::default(),
        }
    }

    /// Replace the tunables.
    #[must_use]
    pub fn with_config(mut self, config: ImpactAnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ImpactClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Analyze the impact of changing `changed_files` for `request`.
    ///
    /// Never fails: graph failures degrade to fewer cascading files and to
    /// conventional fallbacks for keyword buckets.
    pub async fn analyze(
        &self,
        project_path: &Path,
        request: &str,
        changed_files: &[String],
    ) -> ImpactAnalysisResult {
        let detailed = request.chars().count() > ledecouverte::model::DETAILED_REQUEST_CHARS;
        info!(
            "impact analysis for {} changed file(s): '{}'",
            changed_files.len(),
            request
        );

        // Primary
        let mut primary_paths: Vec<String> = Vec::new();
        let mentioned = PATH_MENTION
            .find_iter(request)
            .map(|m| m.as_str().to_string());
        for raw in changed_files.iter().cloned().chain(mentioned) {
            let path = normalize_path(project_path, &raw);
            if !path.is_empty() && !primary_paths.contains(&path) {
                primary_paths.push(path);
            }
        }
        let primary_files: Vec<AffectedFile> = primary_paths
            .iter()
            .map(|path| {
                let kind = self.kind_of(path);
                AffectedFile::new(
                    path.as_str(),
                    kind,
                    ChangeKind::Update,
                    format!("Apply requested change: {request}"),
                )
                .with_priority(Priority::High)
                .with_complexity(u32::from(complexity_for(kind, detailed)))
            })
            .collect();

        // Cascading
        let reached: Vec<Vec<Cascade>> = stream::iter(primary_paths.iter())
            .map(|path| self.cascade_from(project_path, path))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;
        let cascading_files: Vec<AffectedFile> = dedupe_cascades(
            reached.into_iter().flatten(),
            &primary_paths,
        )
        .into_iter()
        .map(|cascade| {
            let kind = self.kind_of(&cascade.path);
            let via = cascade
                .relationship
                .map_or("related", RelationshipType::as_str);
            AffectedFile::new(
                cascade.path.as_str(),
                kind,
                ChangeKind::Update,
                format!(
                    "Verify compatibility with changes in {} ({via}, depth {})",
                    cascade.source, cascade.depth
                ),
            )
            .with_priority(cascade.priority)
            .with_complexity(u32::from(complexity_for(kind, detailed)))
            .with_dependencies(vec![cascade.source])
        })
        .collect();

        let mut taken: HashSet<String> = primary_files
            .iter()
            .chain(&cascading_files)
            .map(|f| f.file_path.clone())
            .collect();

        // Keyword buckets
        let bucket = BucketRequest {
            root: project_path,
            request,
            primary: &primary_paths,
            detailed,
        };
        let config_files = self.keyword_bucket(&CONFIG_TRIGGER, &bucket, &mut taken).await;
        let documentation_files = self
            .keyword_bucket(&DOCUMENTATION_TRIGGER, &bucket, &mut taken)
            .await;
        let test_files = self.keyword_bucket(&TEST_TRIGGER, &bucket, &mut taken).await;
        let deployment_files = self
            .keyword_bucket(&DEPLOYMENT_TRIGGER, &bucket, &mut taken)
            .await;

        let mut result = ImpactAnalysisResult {
            primary_files,
            cascading_files,
            config_files,
            documentation_files,
            test_files,
            deployment_files,
            ..ImpactAnalysisResult::default()
        };
        result.total_files = result.all_files().count();
        result.estimated_time = estimate_duration(result.total_files);
        let risk_level = RiskFactors {
            total_files: result.total_files,
            touches_config: result.all_files().any(|f| f.file_kind == FileKind::Config),
            touches_deployment: result
                .all_files()
                .any(|f| f.file_kind == FileKind::Deployment),
            has_critical_file: result.all_files().any(|f| f.priority == Priority::Critical),
        }
        .assess();
        result.risk_level = risk_level;

        info!(
            "impact analysis: {} files, risk {}, about {}",
            result.total_files, result.risk_level, result.estimated_time
        );
        result
    }

    fn kind_of(&self, path: &str) -> FileKind {
        crate::classify::file_kind_for(path, self.classifier.classify(path))
    }

    async fn cascade_from(&self, root: &Path, primary: &str) -> Vec<Cascade> {
        self.supervisor
            .run_with(
                &format!("cascade:{primary}"),
                self.config.file_policy,
                |token| self.dependents_of(root, primary, token),
                Vec::new(),
            )
            .await
            .into_value()
    }

    async fn dependents_of(
        &self,
        root: &Path,
        primary: &str,
        token: CancellationToken,
    ) -> anyhow::Result<Vec<Cascade>> {
        let nodes = self.graph.search(primary, token.clone()).await?;
        let mut cascades = Vec::new();
        for anchor in nodes.iter().filter(|n| {
            n.file_path
                .as_deref()
                .is_some_and(|p| same_file(&normalize_path(root, p), primary))
        }) {
            let reached = self
                .graph
                .find_related(
                    &anchor.id,
                    self.config.max_depth,
                    &EXPANSION_RELATIONSHIPS,
                    token.clone(),
                )
                .await?;
            for node in reached {
                let Some(raw) = node.file_path.as_deref() else {
                    continue;
                };
                let path = normalize_path(root, raw);
                if path.is_empty() || same_file(&path, primary) {
                    continue;
                }
                let depth = node.depth.unwrap_or(1).max(1);
                cascades.push(Cascade {
                    path,
                    source: primary.to_string(),
                    relationship: node.relationship,
                    depth,
                    priority: cascade_priority(node.relationship, depth),
                });
            }
        }
        Ok(cascades)
    }

    async fn keyword_bucket(
        &self,
        trigger: &KeywordTrigger,
        bucket: &BucketRequest<'_>,
        taken: &mut HashSet<String>,
    ) -> Vec<AffectedFile> {
        let keywords = trigger.matches(bucket.request);
        if keywords.is_empty() {
            return Vec::new();
        }
        debug!("{} triggered by {:?}", trigger.layer, keywords);

        let mut paths = Vec::new();
        for keyword in &keywords {
            let found = self
                .supervisor
                .run_with(
                    &format!("keyword-search:{keyword}"),
                    self.config.file_policy,
                    |token| self.graph.search(keyword, token),
                    Vec::new(),
                )
                .await
                .into_value();
            for node in found {
                let Some(raw) = node.file_path.as_deref() else {
                    continue;
                };
                let path = normalize_path(bucket.root, raw);
                if !path.is_empty()
                    && self.classifier.classify(&path) == trigger.layer
                    && !paths.contains(&path)
                {
                    paths.push(path);
                }
            }
        }

        if paths.is_empty() {
            match trigger.fallback {
                Some(fallback) => paths.push(fallback.to_string()),
                None => paths.extend(bucket.primary.iter().filter_map(|p| test_counterpart(p))),
            }
        }

        let mut files = Vec::new();
        for path in paths {
            if !taken.insert(path.clone()) {
                continue;
            }
            let exists = tokio::fs::try_exists(bucket.root.join(&path))
                .await
                .unwrap_or(false);
            let change = if exists {
                ChangeKind::Update
            } else {
                ChangeKind::Create
            };
            let kind = crate::classify::file_kind_for(&path, trigger.layer);
            files.push(
                AffectedFile::new(
                    path.as_str(),
                    kind,
                    change,
                    bucket_description(trigger.layer, &path, bucket.request),
                )
                .with_priority(trigger.priority)
                .with_complexity(u32::from(complexity_for(kind, bucket.detailed)))
                .with_dependencies(bucket.primary.to_vec()),
            );
        }
        files
    }
}

/// Request context shared by every keyword bucket.
struct BucketRequest<'a> {
    root: &'a Path,
    request: &'a str,
    primary: &'a [String],
    detailed: bool,
}

fn bucket_description(layer: ImpactLayer, path: &str, request: &str) -> String {
    match layer {
        ImpactLayer::ConfigLayer => format!("Review configuration in {path} for: {request}"),
        ImpactLayer::Documentation => format!("Document the change in {path}: {request}"),
        ImpactLayer::TestLayer => format!("Cover the change with tests in {path}: {request}"),
        ImpactLayer::DeploymentLayer => {
            format!("Check deployment impact in {path}: {request}")
        }
        other => format!("Update {} in {path}: {request}", other.title()),
    }
}

/// One entry per path, keeping the highest priority; primary files excluded.
fn dedupe_cascades(
    cascades: impl Iterator<Item = Cascade>,
    primary: &[String],
) -> Vec<Cascade> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, Cascade> = HashMap::new();
    for cascade in cascades {
        if primary.iter().any(|p| same_file(p, &cascade.path)) {
            continue;
        }
        match best.get(&cascade.path) {
            Some(existing)
                if existing.priority > cascade.priority
                    || (existing.priority == cascade.priority
                        && existing.depth <= cascade.depth) => {}
            Some(_) => {
                best.insert(cascade.path.clone(), cascade);
            }
            None => {
                order.push(cascade.path.clone());
                best.insert(cascade.path.clone(), cascade);
            }
        }
    }
    order.into_iter().filter_map(|p| best.remove(&p)).collect()
}
