// Building the graph from a project on disk

use legraphe::{EdgeType, RelationshipGraph, Traversal};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn mixed_language_project() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "web/src/api/routes.ts", "import { Cache } from '../core/cache';\nexport function routes() {}\n");
    write(root, "web/src/core/cache.ts", "export class Cache {}\n");
    write(root, "web/src/core/cache.test.ts", "import { Cache } from './cache';\n");
    write(root, "svc/app/models.py", "class User:\n    pass\n");
    write(root, "svc/app/views.py", "from .models import User\n\ndef index():\n    pass\n");
    write(root, "engine/src/lib.rs", "mod planner;\npub use crate::planner::Plan;\n");
    write(root, "engine/src/planner.rs", "pub struct Plan;\n");
    write(root, "web/node_modules/dep/index.js", "export const x = 1;\n");

    let graph = RelationshipGraph::build(root).unwrap();
    let stats = graph.stats();
    assert_eq!(stats.files, 7);

    let related = graph
        .find_related("web/src/core/cache.ts", 3, &[EdgeType::Imports, EdgeType::Tests], Traversal::Both)
        .unwrap();
    let mut reached: Vec<_> = related.iter().map(|r| r.node.id.as_str()).collect();
    reached.sort();
    assert_eq!(reached, vec!["web/src/api/routes.ts", "web/src/core/cache.test.ts"]);

    let views = graph
        .find_related("svc/app/views.py", 1, &[EdgeType::Imports], Traversal::Outgoing)
        .unwrap();
    assert_eq!(views[0].node.id, "svc/app/models.py");

    let planner = graph.dependents("engine/src/planner.rs", 2).unwrap();
    assert_eq!(planner.len(), 1);
    assert_eq!(planner[0].node.id, "engine/src/lib.rs");
    assert_eq!(planner[0].relationship, EdgeType::Imports);

    assert!(graph.node("web/node_modules/dep/index.js").is_none());
    assert!(graph.node("svc/app/views.py#index").is_some());
}

#[test]
fn missing_root_fails() {
    assert!(RelationshipGraph::build(Path::new("/nonexistent/legraphe")).is_err());
}
