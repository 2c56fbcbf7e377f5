//! legraphe - Relationship Graph
//!
//! *Le Graphe* (The Graph) - File and symbol relationships with depth-bounded traversal

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Relationship graph construction and traversal.
pub mod graph;
/// Import specifier resolution.
pub mod resolve;

pub use graph::{
    EdgeType, GraphError, GraphStats, Node, NodeId, NodeKind, RelatedNode, RelationshipGraph,
    Traversal, SEARCH_LIMIT,
};
pub use resolve::{is_test_file, Resolver};

/// Graph library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
