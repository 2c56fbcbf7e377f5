//! Path-based layer classification.
//!
//! Classification is a total function: rules are tried in order, the first
//! match wins, and a path no rule matches lands in [`ImpactLayer::CoreLogic`].

use std::collections::{HashMap, HashSet};

use ledecouverte::{
    clamp_complexity, AffectedFile, DiscoveredImpact, FileKind, OrchestrationRequest, Priority,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layer::ImpactLayer;

/// Base complexity of a source file.
pub const CODE_COMPLEXITY: u32 = 5;
/// Base complexity of any other artifact.
pub const OTHER_COMPLEXITY: u32 = 2;
/// Bonus applied when the request text is detailed.
pub const DETAILED_REQUEST_BONUS: u32 = 2;

const STATIC_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2", "ttf", "eot",
];

/// How a rule inspects a lower-cased, forward-slash path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Path contains the text anywhere.
    Substring(&'static str),
    /// One `/`-separated segment equals the text.
    PathSegment(&'static str),
    /// File extension equals the text.
    Extension(&'static str),
    /// File name equals the text.
    FileName(&'static str),
}

impl Matcher {
    /// Test a lower-cased path.
    pub fn matches(&self, path: &str) -> bool {
        match *self {
            Self::Substring(needle) => path.contains(needle),
            Self::PathSegment(segment) => path.split('/').any(|s| s == segment),
            Self::Extension(ext) => extension(path) == Some(ext),
            Self::FileName(name) => file_name(path) == name,
        }
    }
}

/// One classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    /// Layer assigned on match.
    pub layer: ImpactLayer,
    /// Path test.
    pub matcher: Matcher,
}

const fn rule(layer: ImpactLayer, matcher: Matcher) -> ClassificationRule {
    ClassificationRule { layer, matcher }
}

use ImpactLayer::{
    ApiLayer, ConfigLayer, DataLayer, DeploymentLayer, Documentation, TestLayer, UiLayer,
};
use Matcher::{Extension, FileName, PathSegment, Substring};

/// Default rules. Order is precedence: test > data > api > ui > config > deployment > docs.
pub const DEFAULT_RULES: &[ClassificationRule] = &[
    rule(TestLayer, Substring("test")),
    rule(TestLayer, Substring("spec")),
    rule(TestLayer, Substring("__tests__")),
    rule(DataLayer, Substring("model")),
    rule(DataLayer, Substring("schema")),
    rule(DataLayer, Substring("migration")),
    rule(DataLayer, Substring("entity")),
    rule(DataLayer, Substring("repository")),
    rule(DataLayer, Substring("database")),
    rule(DataLayer, Substring("/db/")),
    rule(DataLayer, PathSegment("db")),
    rule(DataLayer, Substring("dao")),
    rule(DataLayer, Extension("sql")),
    rule(DataLayer, Substring("prisma")),
    rule(ApiLayer, Substring("api")),
    rule(ApiLayer, Substring("route")),
    rule(ApiLayer, Substring("controller")),
    rule(ApiLayer, Substring("handler")),
    rule(ApiLayer, Substring("endpoint")),
    rule(ApiLayer, Substring("server")),
    rule(ApiLayer, Substring("graphql")),
    rule(ApiLayer, Substring("resolver")),
    rule(UiLayer, Substring("component")),
    rule(UiLayer, Substring("view")),
    rule(UiLayer, Substring("page")),
    rule(UiLayer, PathSegment("ui")),
    rule(UiLayer, Extension("tsx")),
    rule(UiLayer, Extension("jsx")),
    rule(UiLayer, Extension("vue")),
    rule(UiLayer, Extension("svelte")),
    rule(UiLayer, Extension("css")),
    rule(UiLayer, Extension("scss")),
    rule(UiLayer, Extension("html")),
    rule(UiLayer, Substring("style")),
    rule(UiLayer, Substring("frontend")),
    rule(ConfigLayer, Substring("config")),
    rule(ConfigLayer, Substring("settings")),
    rule(ConfigLayer, Substring(".env")),
    rule(ConfigLayer, Extension("toml")),
    rule(ConfigLayer, Extension("ini")),
    rule(ConfigLayer, Extension("cfg")),
    rule(ConfigLayer, Extension("conf")),
    rule(DeploymentLayer, Substring("docker")),
    rule(DeploymentLayer, Substring("deploy")),
    rule(DeploymentLayer, Substring("k8s")),
    rule(DeploymentLayer, Substring("kubernetes")),
    rule(DeploymentLayer, Substring("helm")),
    rule(DeploymentLayer, Substring("terraform")),
    rule(DeploymentLayer, Extension("tf")),
    rule(DeploymentLayer, Substring(".github/workflows")),
    rule(DeploymentLayer, Substring(".gitlab-ci")),
    rule(DeploymentLayer, FileName("jenkinsfile")),
    rule(DeploymentLayer, FileName("procfile")),
    rule(Documentation, Extension("md")),
    rule(Documentation, Extension("rst")),
    rule(Documentation, Extension("adoc")),
    rule(Documentation, Extension("txt")),
    rule(Documentation, Substring("docs/")),
    rule(Documentation, Substring("readme")),
    rule(Documentation, Substring("changelog")),
];

/// Discovered paths partitioned into the eight layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImpactAreas {
    /// Core logic files.
    pub core_logic: Vec<String>,
    /// Data layer files.
    pub data_layer: Vec<String>,
    /// API layer files.
    pub api_layer: Vec<String>,
    /// UI layer files.
    pub ui_layer: Vec<String>,
    /// Test files.
    pub test_layer: Vec<String>,
    /// Configuration files.
    pub config_layer: Vec<String>,
    /// Deployment files.
    pub deployment_layer: Vec<String>,
    /// Documentation files.
    pub documentation: Vec<String>,
}

impl ImpactAreas {
    /// Files of one layer.
    pub fn get(&self, layer: ImpactLayer) -> &[String] {
        match layer {
            ImpactLayer::CoreLogic => &self.core_logic,
            ImpactLayer::DataLayer => &self.data_layer,
            ImpactLayer::ApiLayer => &self.api_layer,
            ImpactLayer::UiLayer => &self.ui_layer,
            ImpactLayer::TestLayer => &self.test_layer,
            ImpactLayer::ConfigLayer => &self.config_layer,
            ImpactLayer::DeploymentLayer => &self.deployment_layer,
            ImpactLayer::Documentation => &self.documentation,
        }
    }

    fn get_mut(&mut self, layer: ImpactLayer) -> &mut Vec<String> {
        match layer {
            ImpactLayer::CoreLogic => &mut self.core_logic,
            ImpactLayer::DataLayer => &mut self.data_layer,
            ImpactLayer::ApiLayer => &mut self.api_layer,
            ImpactLayer::UiLayer => &mut self.ui_layer,
            ImpactLayer::TestLayer => &mut self.test_layer,
            ImpactLayer::ConfigLayer => &mut self.config_layer,
            ImpactLayer::DeploymentLayer => &mut self.deployment_layer,
            ImpactLayer::Documentation => &mut self.documentation,
        }
    }

    /// Non-empty layers in planning order.
    pub fn iter(&self) -> impl Iterator<Item = (ImpactLayer, &[String])> {
        ImpactLayer::ALL
            .into_iter()
            .map(|layer| (layer, self.get(layer)))
            .filter(|(_, files)| !files.is_empty())
    }

    /// Total number of files.
    pub fn total(&self) -> usize {
        ImpactLayer::ALL.iter().map(|l| self.get(*l).len()).sum()
    }

    /// True if no layer holds a file.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Layer holding `path`, if any.
    pub fn layer_of(&self, path: &str) -> Option<ImpactLayer> {
        ImpactLayer::ALL
            .into_iter()
            .find(|layer| self.get(*layer).iter().any(|p| p == path))
    }
}

/// Classifier output: the partition plus one refined entry per file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifiedImpact {
    /// Layer partition.
    pub areas: ImpactAreas,
    /// Affected files in discovery order.
    pub files: Vec<AffectedFile>,
}

impl ClassifiedImpact {
    /// Entry for `path`.
    pub fn file(&self, path: &str) -> Option<&AffectedFile> {
        self.files.iter().find(|f| f.file_path == path)
    }
}

/// Assigns files to layers and refines their planning attributes.
#[derive(Debug, Clone)]
pub struct ImpactClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ImpactClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl ImpactClassifier {
    /// Classifier over an explicit rule list, tried in order.
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// First rule matching `path`.
    pub fn matching_rule(&self, path: &str) -> Option<&ClassificationRule> {
        let lowered = path.replace('\\', "/").to_lowercase();
        self.rules.iter().find(|rule| rule.matcher.matches(&lowered))
    }

    /// Layer of `path`.
    pub fn classify(&self, path: &str) -> ImpactLayer {
        self.matching_rule(path)
            .map(|rule| rule.layer)
            .unwrap_or_default()
    }

    /// Partition paths into layers. Duplicates are kept once.
    pub fn partition<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> ImpactAreas {
        let mut areas = ImpactAreas::default();
        let mut seen = HashSet::new();
        for path in paths {
            if seen.insert(path) {
                areas.get_mut(self.classify(path)).push(path.to_string());
            }
        }
        areas
    }

    /// Classify a discovery result into layers and affected files.
    pub fn classify_impact(
        &self,
        impact: &DiscoveredImpact,
        request: &OrchestrationRequest,
    ) -> ClassifiedImpact {
        let areas = self.partition(impact.files.iter().map(|f| f.file_path.as_str()));
        let present: HashSet<&str> = impact.files.iter().map(|f| f.file_path.as_str()).collect();
        let detailed = request.is_detailed();

        let mut dependencies: HashMap<&str, Vec<String>> = HashMap::new();
        for file in &impact.files {
            if let Some(source) = file.source_file.as_deref() {
                if source != file.file_path && present.contains(source) {
                    dependencies
                        .entry(file.file_path.as_str())
                        .or_default()
                        .push(source.to_string());
                }
            }
        }

        let files = impact
            .files
            .iter()
            .map(|discovered| {
                let path = discovered.file_path.as_str();
                let layer = self.classify(path);
                let kind = file_kind_for(path, layer);
                AffectedFile::new(
                    path,
                    kind,
                    discovered.change_kind.unwrap_or_default(),
                    describe(layer, path, &request.query),
                )
                .with_priority(Priority::Medium)
                .with_complexity(u32::from(complexity_for(kind, detailed)))
                .with_dependencies(dependencies.remove(path).unwrap_or_default())
            })
            .collect::<Vec<_>>();

        debug!(
            "classified {} files into {} layers",
            files.len(),
            areas.iter().count()
        );

        ClassifiedImpact { areas, files }
    }
}

/// Complexity estimate: base score per kind plus a bonus for detailed requests.
pub fn complexity_for(kind: FileKind, detailed_request: bool) -> u8 {
    let base = if kind == FileKind::Code {
        CODE_COMPLEXITY
    } else {
        OTHER_COMPLEXITY
    };
    let bonus = if detailed_request {
        DETAILED_REQUEST_BONUS
    } else {
        0
    };
    clamp_complexity(base + bonus)
}

/// Artifact kind of `path` given its layer.
pub fn file_kind_for(path: &str, layer: ImpactLayer) -> FileKind {
    let lowered = path.to_lowercase();
    match extension(&lowered) {
        Some(ext) if STATIC_EXTENSIONS.contains(&ext) => FileKind::Static,
        _ => layer.file_kind(),
    }
}

fn describe(layer: ImpactLayer, path: &str, query: &str) -> String {
    let action = match layer {
        ImpactLayer::CoreLogic => "Implement core logic changes",
        ImpactLayer::DataLayer => "Adjust data models and persistence",
        ImpactLayer::ApiLayer => "Update API surface",
        ImpactLayer::UiLayer => "Update user interface",
        ImpactLayer::TestLayer => "Add or update tests",
        ImpactLayer::ConfigLayer => "Update configuration",
        ImpactLayer::DeploymentLayer => "Update deployment setup",
        ImpactLayer::Documentation => "Update documentation",
    };
    format!("{action} in {path} for: {query}")
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => Some(ext),
        _ => None,
    }
}
