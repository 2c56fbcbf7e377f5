// Import specifier resolution against a known file set

use leparse::languages::Language;
use std::collections::{BTreeSet, HashSet};

/// Join `base` and `relative` and collapse `.`/`..` segments.
///
/// Returns `None` when the result would escape the project root.
pub fn normalize_relative(base: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Directory part of a relative path (`""` for top-level files).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    name.split_once('.').map_or(name, |(stem, _)| stem)
}

/// True for files that hold tests rather than the code under test.
pub fn is_test_file(path: &str) -> bool {
    let name = file_name(path).to_ascii_lowercase();
    name.contains(".test.")
        || name.contains(".spec.")
        || name.starts_with("test_")
        || name.ends_with("_test.go")
        || name.ends_with("_test.py")
        || path
            .split('/')
            .any(|segment| matches!(segment, "tests" | "test" | "__tests__" | "spec"))
}

/// Name stem of the code a test file covers (`cache.test.ts` -> `cache`).
pub fn tested_stem(path: &str) -> Option<&str> {
    let stem = file_stem(path);
    let stem = stem
        .strip_prefix("test_")
        .or_else(|| stem.strip_suffix("_test"))
        .unwrap_or(stem);
    (!stem.is_empty() && stem != "mod" && stem != "index").then_some(stem)
}

/// Resolves import specifiers to files in the project.
pub struct Resolver<'a> {
    files: &'a HashSet<String>,
    go_packages: BTreeSet<String>,
}

impl<'a> Resolver<'a> {
    /// Build a resolver over project-relative, `/`-separated paths.
    pub fn new(files: &'a HashSet<String>) -> Self {
        let go_packages = files
            .iter()
            .filter(|f| f.ends_with(".go"))
            .map(|f| parent_dir(f).to_string())
            .filter(|dir| !dir.is_empty())
            .collect();
        Self { files, go_packages }
    }

    /// Resolve one import of `importer`; empty when it names nothing local.
    pub fn resolve(&self, importer: &str, language: Language, specifier: &str) -> Vec<String> {
        match language {
            Language::TypeScript | Language::JavaScript => {
                self.resolve_relative(importer, language, specifier)
            }
            Language::Python => self.resolve_python(importer, specifier),
            Language::Rust => self.resolve_rust(importer, specifier),
            Language::Go => self.resolve_go(specifier),
        }
        .into_iter()
        .filter(|target| target != importer)
        .collect()
    }

    fn first_existing<I>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        candidates
            .into_iter()
            .find(|c| self.files.contains(c))
            .into_iter()
            .collect()
    }

    fn module_candidates(&self, base: &str, language: Language) -> Vec<String> {
        let mut candidates = vec![base.to_string()];
        let stripped = match file_name(base).rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => &base[..base.len() - ext.len() - 1],
            _ => base,
        };
        for ext in language.resolution_extensions() {
            candidates.push(format!("{stripped}.{ext}"));
            if stripped != base {
                candidates.push(format!("{base}.{ext}"));
            }
        }
        for index in language.index_files() {
            candidates.push(if base.is_empty() {
                (*index).to_string()
            } else {
                format!("{base}/{index}")
            });
        }
        candidates
    }

    fn resolve_relative(&self, importer: &str, language: Language, specifier: &str) -> Vec<String> {
        if !specifier.starts_with('.') {
            return Vec::new();
        }
        let Some(base) = normalize_relative(parent_dir(importer), specifier) else {
            return Vec::new();
        };
        self.first_existing(self.module_candidates(&base, language))
    }

    fn resolve_python(&self, importer: &str, specifier: &str) -> Vec<String> {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let module = specifier[dots..].replace('.', "/");

        let base = if dots == 0 {
            module
        } else {
            let mut dir = parent_dir(importer).to_string();
            for _ in 1..dots {
                dir = parent_dir(&dir).to_string();
            }
            match (dir.is_empty(), module.is_empty()) {
                (_, true) => dir,
                (true, false) => module,
                (false, false) => format!("{dir}/{module}"),
            }
        };
        self.first_existing(self.module_candidates(&base, Language::Python))
    }

    // Directory holding a Rust file's child modules.
    fn rust_module_dir(importer: &str) -> String {
        let dir = parent_dir(importer);
        match file_name(importer) {
            "lib.rs" | "main.rs" | "mod.rs" => dir.to_string(),
            _ => {
                let stem = file_stem(importer);
                if dir.is_empty() {
                    stem.to_string()
                } else {
                    format!("{dir}/{stem}")
                }
            }
        }
    }

    fn rust_crate_root(importer: &str) -> String {
        let segments: Vec<&str> = importer.split('/').collect();
        match segments.iter().rposition(|s| *s == "src") {
            Some(index) => segments[..=index].join("/"),
            None => parent_dir(importer).to_string(),
        }
    }

    fn resolve_rust(&self, importer: &str, specifier: &str) -> Vec<String> {
        if let Some(name) = specifier.strip_prefix("./") {
            let dir = Self::rust_module_dir(importer);
            let base = join(&dir, name);
            return self.first_existing([format!("{base}.rs"), format!("{base}/mod.rs")]);
        }

        let mut segments = specifier.split("::");
        let base = match segments.next() {
            Some("crate") => Self::rust_crate_root(importer),
            Some("self") => Self::rust_module_dir(importer),
            Some("super") => parent_dir(&Self::rust_module_dir(importer)).to_string(),
            _ => return Vec::new(),
        };
        let rest: Vec<&str> = segments.collect();

        // Longest module prefix wins; trailing segments may name items.
        let candidates = (0..=rest.len()).rev().flat_map(|len| {
            if len == 0 {
                let module = &base;
                vec![
                    format!("{module}.rs"),
                    format!("{module}/mod.rs"),
                    format!("{module}/lib.rs"),
                    format!("{module}/main.rs"),
                ]
            } else {
                let module = join(&base, &rest[..len].join("/"));
                vec![format!("{module}.rs"), format!("{module}/mod.rs")]
            }
        });
        self.first_existing(candidates)
    }

    fn resolve_go(&self, specifier: &str) -> Vec<String> {
        let Some(package) = self
            .go_packages
            .iter()
            .filter(|dir| specifier == dir.as_str() || specifier.ends_with(&format!("/{dir}")))
            .max_by_key(|dir| dir.len())
        else {
            return Vec::new();
        };
        let mut targets: Vec<String> = self
            .files
            .iter()
            .filter(|f| f.ends_with(".go") && !f.ends_with("_test.go") && parent_dir(f) == package)
            .cloned()
            .collect();
        targets.sort();
        targets
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn files(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[rstest]
    #[case("src/api", "../core/cache", Some("src/core/cache"))]
    #[case("src", "./a/./b", Some("src/a/b"))]
    #[case("", "../outside", None)]
    #[case("", "./top", Some("top"))]
    fn normalizes(#[case] base: &str, #[case] rel: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_relative(base, rel).as_deref(), expected);
    }

    #[rstest]
    #[case("src/cache.test.ts", true)]
    #[case("src/cache.spec.js", true)]
    #[case("tests/test_cache.py", true)]
    #[case("pkg/cache_test.go", true)]
    #[case("src/contest.ts", false)]
    #[case("src/cache.ts", false)]
    fn detects_tests(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_test_file(path), expected);
    }

    #[rstest]
    #[case("src/cache.test.ts", Some("cache"))]
    #[case("tests/test_store.py", Some("store"))]
    #[case("db/store_test.go", Some("store"))]
    #[case("tests/mod.rs", None)]
    fn stems(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(tested_stem(path), expected);
    }

    #[test]
    fn ecmascript_extensions_and_index() {
        let known = files(&["src/core/cache.ts", "src/db/index.js", "src/util.ts"]);
        let resolver = Resolver::new(&known);

        let resolve = |spec| resolver.resolve("src/api/handler.ts", Language::TypeScript, spec);
        assert_eq!(resolve("../core/cache"), vec!["src/core/cache.ts"]);
        assert_eq!(resolve("../db"), vec!["src/db/index.js"]);
        assert_eq!(resolve("../util.js"), vec!["src/util.ts"]);
        assert!(resolve("react").is_empty());
        assert!(resolve("../missing").is_empty());
    }

    #[test]
    fn python_relative_and_absolute() {
        let known = files(&[
            "app/models.py",
            "app/services/__init__.py",
            "app/services/billing.py",
            "app/__init__.py",
        ]);
        let resolver = Resolver::new(&known);
        let importer = "app/services/billing.py";

        assert_eq!(
            resolver.resolve(importer, Language::Python, "..models"),
            vec!["app/models.py"]
        );
        assert_eq!(
            resolver.resolve(importer, Language::Python, "."),
            vec!["app/services/__init__.py"]
        );
        assert_eq!(
            resolver.resolve("main.py", Language::Python, "app.models"),
            vec!["app/models.py"]
        );
        assert!(resolver.resolve(importer, Language::Python, "os.path").is_empty());
    }

    #[test]
    fn rust_modules_and_paths() {
        let known = files(&[
            "crates/core/src/lib.rs",
            "crates/core/src/planner.rs",
            "crates/core/src/planner/waves.rs",
            "crates/core/src/store/mod.rs",
        ]);
        let resolver = Resolver::new(&known);

        let lib = "crates/core/src/lib.rs";
        assert_eq!(
            resolver.resolve(lib, Language::Rust, "./store"),
            vec!["crates/core/src/store/mod.rs"]
        );
        assert_eq!(
            resolver.resolve(lib, Language::Rust, "crate::planner::Plan"),
            vec!["crates/core/src/planner.rs"]
        );
        assert_eq!(
            resolver.resolve("crates/core/src/planner.rs", Language::Rust, "./waves"),
            vec!["crates/core/src/planner/waves.rs"]
        );
        assert_eq!(
            resolver.resolve("crates/core/src/planner/waves.rs", Language::Rust, "super::Plan"),
            vec!["crates/core/src/planner.rs"]
        );
    }

    #[test]
    fn go_packages_by_suffix() {
        let known = files(&["internal/db/db.go", "internal/db/db_test.go", "cmd/main.go"]);
        let resolver = Resolver::new(&known);
        assert_eq!(
            resolver.resolve("cmd/main.go", Language::Go, "example.com/app/internal/db"),
            vec!["internal/db/db.go"]
        );
        assert!(resolver.resolve("cmd/main.go", Language::Go, "fmt").is_empty());
    }
}
