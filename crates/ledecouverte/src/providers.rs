use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lesuperviseur::CancellationToken;
use serde::{Deserialize, Serialize};

use crate::impact::{CodeElement, GraphNode, RelationshipType, ScoredFile};
use crate::model::Intent;

/// Parameters passed to a [`FileDiscoveryProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    /// Query text.
    pub query: String,
    /// Project root.
    pub project_path: PathBuf,
    /// Project identifier.
    pub project_id: String,
    /// Request intent.
    pub intent: Intent,
    /// Upper bound on primary files.
    pub max_files: usize,
    /// Ask the provider for related files as well.
    pub include_related: bool,
}

/// Semantic discovery result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileDiscovery {
    /// Files matching the query.
    pub primary_files: Vec<ScoredFile>,
    /// Files related to the primary hits.
    #[serde(default)]
    pub related_files: Vec<ScoredFile>,
}

impl FileDiscovery {
    /// True if both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.primary_files.is_empty() && self.related_files.is_empty()
    }
}

/// File entry of a structural analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralFile {
    /// Path as reported by the analyzer.
    pub file_path: String,
    /// Elements declared in the file.
    pub elements: Vec<CodeElement>,
}

/// Structural analysis result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralAnalysis {
    /// Files visited by the analyzer.
    pub relevant_files: Vec<StructuralFile>,
}

/// Semantic file-discovery service.
///
/// Implementations must stop work promptly once `cancel` fires; the
/// coordinator drops the call after its timeout either way.
#[async_trait]
pub trait FileDiscoveryProvider: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Prepare the provider. Called once before the first discovery.
    async fn initialize(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }

    /// Find files relevant to a query.
    async fn discover(
        &self,
        query: &DiscoveryQuery,
        cancel: CancellationToken,
    ) -> anyhow::Result<FileDiscovery>;
}

/// Code relationship graph service.
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Service name used in logs.
    fn name(&self) -> &str;

    /// Prepare the service. Called once before the first query.
    async fn initialize(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }

    /// Nodes matching free text.
    async fn search(&self, text: &str, cancel: CancellationToken)
        -> anyhow::Result<Vec<GraphNode>>;

    /// Nodes reachable from `node_id` within `max_depth` hops over `relationships`.
    async fn find_related(
        &self,
        node_id: &str,
        max_depth: usize,
        relationships: &[RelationshipType],
        cancel: CancellationToken,
    ) -> anyhow::Result<Vec<GraphNode>>;
}

/// Structural code analyzer.
#[async_trait]
pub trait StructuralAnalyzer: Send + Sync {
    /// Analyzer name used in logs.
    fn name(&self) -> &str;

    /// Prepare the analyzer.
    async fn initialize(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }

    /// Analyze `path` (a file or directory) up to `max_depth` levels.
    async fn analyze(
        &self,
        path: &Path,
        max_depth: usize,
        cancel: CancellationToken,
    ) -> anyhow::Result<StructuralAnalysis>;
}
