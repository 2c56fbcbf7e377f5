// Indexing a project on disk

use lerecherche::{IndexError, KeywordIndex, SearchQuery};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn indexes_text_files_and_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/session.ts", "export class TokenBucket {}\n");
    write(root, "src/util.ts", "export function pad() {}\n");
    write(root, "Dockerfile", "FROM node:20\n");
    write(root, "assets/logo.png", "not really a png");
    write(root, "node_modules/bucket/index.js", "module.exports = 1;\n");
    write(root, ".git/config", "[core]\n");

    let index = KeywordIndex::build(root, None).unwrap();
    let mut paths: Vec<_> = index.paths().collect();
    paths.sort();
    assert_eq!(paths, vec!["Dockerfile", "src/session.ts", "src/util.ts"]);

    let results = index.search(&SearchQuery::new("rate limit with a token bucket", 10)).unwrap();
    assert_eq!(results.primary.len(), 1);
    assert_eq!(results.primary[0].file_path, "src/session.ts");
    assert_eq!(results.primary[0].matched_terms, vec!["token", "bucket"]);
    assert_eq!(results.related[0].file_path, "src/util.ts");
}

#[test]
fn missing_root() {
    assert!(matches!(
        KeywordIndex::build(Path::new("/nonexistent/lerecherche"), None),
        Err(IndexError::RootNotFound(_))
    ));
}
