// Relationship graph over project files and the symbols they define

use crate::resolve::{is_test_file, parent_dir, tested_stem, Resolver};
use leparse::languages::Language;
use leparse::parallel::ParallelScanner;
use leparse::scanner::discover_source_files;
use leparse::traits::{ParsedFile, SymbolKind};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;

/// Node ID type
pub type NodeId = petgraph::stable_graph::NodeIndex;

/// Errors from graph construction and queries
#[derive(Debug, Error)]
pub enum GraphError {
    /// No node has the given id
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// The project could not be scanned
    #[error("scan failed: {0}")]
    Scan(#[from] leparse::traits::Error),
}

/// Node kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "type", content = "symbol")]
pub enum NodeKind {
    /// A source file
    File,
    /// A symbol declared in a file
    Symbol(SymbolKind),
}

/// Node in the relationship graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    /// Unique identifier: the file path, or `path#name` for symbols
    pub id: String,

    /// Node kind
    pub kind: NodeKind,

    /// File name or symbol name
    pub name: String,

    /// Project-relative file path
    pub file_path: String,

    /// Declaration line for symbols
    pub line: Option<usize>,
}

impl Node {
    /// True for file nodes
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Relationship carried by an edge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Importer -> imported file
    Imports,
    /// Test file -> file under test
    Tests,
    /// File -> symbol it declares
    Defines,
}

impl EdgeType {
    /// Relationship label (`imports`, `tests`, `defines`)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Imports => "imports",
            Self::Tests => "tests",
            Self::Defines => "defines",
        }
    }
}

/// Which edge directions a traversal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Follow edges forwards (what a node depends on)
    Outgoing,
    /// Follow edges backwards (what depends on a node)
    Incoming,
    /// Both directions
    #[default]
    Both,
}

/// A node reached by a traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedNode {
    /// The reached node
    pub node: Node,
    /// Type of the edge the node was first reached through
    pub relationship: EdgeType,
    /// Hops from the start node (>= 1)
    pub depth: usize,
}

/// Summary counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// File nodes
    pub files: usize,
    /// Symbol nodes
    pub symbols: usize,
    /// Edges
    pub edges: usize,
}

/// Maximum number of nodes returned by [`RelationshipGraph::search`]
pub const SEARCH_LIMIT: usize = 50;

/// File and symbol nodes joined by typed relationship edges.
#[derive(Debug, Default)]
pub struct RelationshipGraph {
    graph: StableGraph<Node, EdgeType>,
    index: HashMap<String, NodeId>,
}

impl RelationshipGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `root` and build the graph from its source files.
    pub fn build(root: &Path) -> Result<Self, GraphError> {
        let files = discover_source_files(root, None)?;
        let results = ParallelScanner::new().scan_files(files);

        let parsed: Vec<ParsedFile> = results
            .into_iter()
            .filter_map(|result| match result.parsed {
                Some(mut parsed) => {
                    parsed.path = relative_path(root, &parsed.path).into();
                    Some(parsed)
                }
                None => {
                    tracing::debug!(
                        "Skipping {}: {}",
                        result.file_path.display(),
                        result.error.unwrap_or_default()
                    );
                    None
                }
            })
            .collect();

        let graph = Self::from_parsed(&parsed);
        let stats = graph.stats();
        tracing::info!(
            "Built relationship graph for {}: {} files, {} symbols, {} edges",
            root.display(),
            stats.files,
            stats.symbols,
            stats.edges
        );
        Ok(graph)
    }

    /// Build from already-scanned files whose paths are project-relative.
    pub fn from_parsed(files: &[ParsedFile]) -> Self {
        let mut graph = Self::new();

        let paths: Vec<String> = files
            .iter()
            .map(|f| f.path.to_string_lossy().replace('\\', "/"))
            .collect();
        for (file, path) in files.iter().zip(&paths) {
            let file_id = graph.add_file(path);
            for symbol in &file.symbols {
                let symbol_id = graph.add_node(Node {
                    id: format!("{path}#{}", symbol.name),
                    kind: NodeKind::Symbol(symbol.kind),
                    name: symbol.name.clone(),
                    file_path: path.clone(),
                    line: Some(symbol.line),
                });
                graph.add_edge(file_id, symbol_id, EdgeType::Defines);
            }
        }

        let known: HashSet<String> = paths.iter().cloned().collect();
        let resolver = Resolver::new(&known);
        for (file, path) in files.iter().zip(&paths) {
            let Some(language) = Language::parse(&file.language) else {
                continue;
            };
            for import in &file.imports {
                for target in resolver.resolve(path, language, &import.path) {
                    graph.link(path, &target, EdgeType::Imports);
                }
            }
        }

        graph.link_tests(&paths);
        graph
    }

    // Test files cover same-stem files in the same language.
    fn link_tests(&mut self, paths: &[String]) {
        let mut by_stem: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
        for path in paths.iter().filter(|p| !is_test_file(p)) {
            if let Some(stem) = tested_stem(path) {
                by_stem.entry((stem, extension(path))).or_default().push(path);
            }
        }

        for test in paths.iter().filter(|p| is_test_file(p)) {
            let Some(stem) = tested_stem(test) else {
                continue;
            };
            let Some(subjects) = by_stem.get(&(stem, extension(test))) else {
                continue;
            };
            // Prefer a subject next to the test; otherwise every same-stem file.
            let local: Vec<&str> = subjects
                .iter()
                .copied()
                .filter(|s| parent_dir(s) == parent_dir(test))
                .collect();
            let chosen = if local.is_empty() { subjects.clone() } else { local };
            for subject in chosen {
                self.link(test, subject, EdgeType::Tests);
            }
        }
    }

    /// Add a file node for a project-relative path
    pub fn add_file(&mut self, path: &str) -> NodeId {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.add_node(Node {
            id: path.to_string(),
            kind: NodeKind::File,
            name,
            file_path: path.to_string(),
            line: None,
        })
    }

    /// Add a node, replacing any node with the same id
    pub fn add_node(&mut self, node: Node) -> NodeId {
        if let Some(&existing) = self.index.get(&node.id) {
            if let Some(weight) = self.graph.node_weight_mut(existing) {
                *weight = node;
            }
            return existing;
        }
        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.index.insert(id, index);
        index
    }

    /// Add an edge between two nodes
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, edge: EdgeType) {
        let duplicate = self
            .graph
            .edges_connecting(from, to)
            .any(|e| *e.weight() == edge);
        if !duplicate && from != to {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Add an edge between nodes identified by id; unknown ids are ignored
    pub fn link(&mut self, from: &str, to: &str, edge: EdgeType) {
        if let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) {
            self.add_edge(a, b, edge);
        }
    }

    /// Node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).and_then(|&i| self.graph.node_weight(i))
    }

    /// Node and edge counts
    pub fn stats(&self) -> GraphStats {
        let files = self.graph.node_weights().filter(|n| n.is_file()).count();
        GraphStats {
            files,
            symbols: self.graph.node_count() - files,
            edges: self.graph.edge_count(),
        }
    }

    /// True if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Case-insensitive search over file paths and symbol names.
    ///
    /// Exact matches rank above suffix matches, which rank above substring
    /// matches; files rank above symbols on ties. At most [`SEARCH_LIMIT`]
    /// nodes are returned.
    pub fn search(&self, text: &str) -> Vec<&Node> {
        let needle = text.trim().to_lowercase().replace('\\', "/");
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(u8, &Node)> = self
            .graph
            .node_weights()
            .filter_map(|node| {
                let haystack = if node.is_file() {
                    node.file_path.to_lowercase()
                } else {
                    node.name.to_lowercase()
                };
                let score = if haystack == needle {
                    3
                } else if haystack.ends_with(&format!("/{needle}")) {
                    2
                } else if haystack.contains(&needle) {
                    1
                } else {
                    return None;
                };
                Some((score * 2 + u8::from(node.is_file()), node))
            })
            .collect();

        hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        hits.into_iter().take(SEARCH_LIMIT).map(|(_, n)| n).collect()
    }

    /// Breadth-first walk from `start` over allowed edge types.
    ///
    /// Each reachable node is reported once, at its shallowest depth, with
    /// the relationship of the edge it was first reached through. An empty
    /// `allowed` list permits every edge type.
    pub fn find_related(
        &self,
        start: &str,
        max_depth: usize,
        allowed: &[EdgeType],
        traversal: Traversal,
    ) -> Result<Vec<RelatedNode>, GraphError> {
        let &origin = self
            .index
            .get(start)
            .ok_or_else(|| GraphError::NodeNotFound(start.to_string()))?;

        let directions: &[Direction] = match traversal {
            Traversal::Outgoing => &[Direction::Outgoing],
            Traversal::Incoming => &[Direction::Incoming],
            Traversal::Both => &[Direction::Outgoing, Direction::Incoming],
        };
        let permitted = |edge: &EdgeType| allowed.is_empty() || allowed.contains(edge);

        let mut visited = HashSet::from([origin]);
        let mut queue = VecDeque::from([(origin, 0usize)]);
        let mut related = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for &direction in directions {
                let mut neighbors: Vec<(NodeId, EdgeType)> = self
                    .graph
                    .edges_directed(current, direction)
                    .filter(|e| permitted(e.weight()))
                    .map(|e| {
                        let other = if direction == Direction::Outgoing {
                            e.target()
                        } else {
                            e.source()
                        };
                        (other, *e.weight())
                    })
                    .collect();
                neighbors.sort_by_key(|(n, _)| n.index());

                for (neighbor, relationship) in neighbors {
                    if !visited.insert(neighbor) {
                        continue;
                    }
                    if let Some(node) = self.graph.node_weight(neighbor) {
                        related.push(RelatedNode {
                            node: node.clone(),
                            relationship,
                            depth: depth + 1,
                        });
                    }
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        Ok(related)
    }

    /// Files that transitively depend on `path` through imports and tests.
    pub fn dependents(&self, path: &str, max_depth: usize) -> Result<Vec<RelatedNode>, GraphError> {
        Ok(self
            .find_related(
                path,
                max_depth,
                &[EdgeType::Imports, EdgeType::Tests],
                Traversal::Incoming,
            )?
            .into_iter()
            .filter(|r| r.node.is_file())
            .collect())
    }
}

fn extension(path: &str) -> &str {
    path.rsplit_once('.').map_or("", |(_, ext)| ext)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use leparse::traits::{ImportInfo, Symbol};

    fn file(path: &str, language: &str, imports: &[&str], symbols: &[(&str, SymbolKind)]) -> ParsedFile {
        ParsedFile {
            path: path.into(),
            language: language.to_string(),
            symbols: symbols
                .iter()
                .enumerate()
                .map(|(i, (name, kind))| Symbol {
                    name: name.to_string(),
                    kind: *kind,
                    line: i + 1,
                })
                .collect(),
            imports: imports
                .iter()
                .map(|p| ImportInfo {
                    path: p.to_string(),
                    line: 1,
                })
                .collect(),
        }
    }

    fn sample() -> RelationshipGraph {
        RelationshipGraph::from_parsed(&[
            file("src/core/cache.ts", "TypeScript", &[], &[("Cache", SymbolKind::Class)]),
            file("src/api/handler.ts", "TypeScript", &["../core/cache", "express"], &[]),
            file("src/app.ts", "TypeScript", &["./api/handler"], &[("main", SymbolKind::Function)]),
            file("src/core/cache.test.ts", "TypeScript", &[], &[]),
        ])
    }

    #[test]
    fn builds_nodes_and_edges() {
        let graph = sample();
        assert_eq!(
            graph.stats(),
            GraphStats {
                files: 4,
                symbols: 2,
                edges: 5
            }
        );
        assert_eq!(graph.node("src/core/cache.ts#Cache").map(|n| n.line), Some(Some(1)));
    }

    #[test]
    fn search_ranks_exact_paths_first() {
        let graph = sample();
        let hits: Vec<_> = graph.search("src/core/cache.ts").iter().map(|n| n.id.clone()).collect();
        assert_eq!(hits, vec!["src/core/cache.ts"]);

        let hits: Vec<_> = graph.search("cache").iter().map(|n| n.id.clone()).collect();
        assert_eq!(
            hits,
            vec!["src/core/cache.ts#Cache", "src/core/cache.test.ts", "src/core/cache.ts"]
        );
        assert!(graph.search("   ").is_empty());
    }

    #[test]
    fn bfs_annotates_depth_and_relationship() {
        let graph = sample();
        let related = graph
            .find_related("src/core/cache.ts", 2, &[EdgeType::Imports, EdgeType::Tests], Traversal::Both)
            .unwrap();
        let view: Vec<_> = related
            .iter()
            .map(|r| (r.node.id.as_str(), r.relationship, r.depth))
            .collect();
        assert_eq!(
            view,
            vec![
                ("src/api/handler.ts", EdgeType::Imports, 1),
                ("src/core/cache.test.ts", EdgeType::Tests, 1),
                ("src/app.ts", EdgeType::Imports, 2),
            ]
        );
    }

    #[test]
    fn depth_and_allow_list_bound_the_walk() {
        let graph = sample();
        let shallow = graph
            .find_related("src/core/cache.ts", 1, &[EdgeType::Imports], Traversal::Incoming)
            .unwrap();
        assert_eq!(shallow.len(), 1);
        assert_eq!(shallow[0].node.id, "src/api/handler.ts");

        let none = graph
            .find_related("src/core/cache.ts", 0, &[], Traversal::Both)
            .unwrap();
        assert!(none.is_empty());

        let forward = graph
            .find_related("src/app.ts", 5, &[EdgeType::Imports], Traversal::Outgoing)
            .unwrap();
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn dependents_are_files_only() {
        let graph = sample();
        let dependents: Vec<_> = graph
            .dependents("src/core/cache.ts", 3)
            .unwrap()
            .into_iter()
            .map(|r| r.node.id)
            .collect();
        assert_eq!(
            dependents,
            vec!["src/api/handler.ts", "src/core/cache.test.ts", "src/app.ts"]
        );
    }

    #[test]
    fn unknown_start_is_an_error() {
        let graph = sample();
        assert!(matches!(
            graph.find_related("nope.ts", 2, &[], Traversal::Both),
            Err(GraphError::NodeNotFound(_))
        ));
    }
}
