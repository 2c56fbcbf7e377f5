// Pattern-driven symbol and import scanning

use crate::languages::Language;
use crate::traits::{Error, ImportInfo, ParsedFile, Result, Symbol};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never descended into when walking a project.
pub const SKIPPED_DIRECTORIES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".leplan",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    ".next",
    "coverage",
];

/// Files larger than this are skipped by directory walks.
pub const MAX_SCANNED_FILE_BYTES: u64 = 1024 * 1024;

/// Maps byte offsets to 1-indexed line numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(next) => next,
        }
    }
}

/// Scan in-memory source for declared symbols and imports.
///
/// The returned file has an empty path; callers that know the path set it.
pub fn scan_source(language: Language, source: &str) -> ParsedFile {
    let config = language.config();
    let line_index = LineIndex::new(source);
    let lines = &line_index;

    let mut symbols: Vec<Symbol> = config
        .symbols
        .iter()
        .flat_map(move |(kind, regex)| {
            let kind = *kind;
            regex.captures_iter(source).filter_map(move |caps| {
                let name = caps.get(1)?;
                Some(Symbol {
                    name: name.as_str().to_string(),
                    kind,
                    line: lines.line_of(name.start()),
                })
            })
        })
        .collect();
    symbols.sort_by_key(|s| s.line);
    symbols.dedup_by(|a, b| a.line == b.line && a.name == b.name);

    let mut imports: Vec<ImportInfo> = config
        .imports
        .iter()
        .flat_map(|regex| regex.captures_iter(source))
        .filter_map(|caps| caps.get(1))
        .map(|m| ImportInfo {
            path: import_path(language, m.as_str()),
            line: lines.line_of(m.start()),
        })
        .collect();

    if let Some(block) = &config.import_block {
        for body in block.block.captures_iter(source).filter_map(|c| c.get(1)) {
            for entry in block.entry.captures_iter(body.as_str()).filter_map(|c| c.get(1)) {
                imports.push(ImportInfo {
                    path: entry.as_str().to_string(),
                    line: lines.line_of(body.start() + entry.start()),
                });
            }
        }
    }

    imports.sort_by_key(|i| i.line);
    imports.dedup_by(|a, b| a.line == b.line && a.path == b.path);

    ParsedFile {
        path: PathBuf::new(),
        language: language.name().to_string(),
        symbols,
        imports,
    }
}

// `mod name;` declares a child file, recorded as `./name`.
fn import_path(language: Language, raw: &str) -> String {
    let is_module_decl = language == Language::Rust && !raw.contains("::");
    if is_module_decl {
        format!("./{raw}")
    } else {
        raw.to_string()
    }
}

/// Scan a file on disk.
pub fn scan_file(path: &Path) -> Result<ParsedFile> {
    let language = Language::from_path(path).ok_or_else(|| {
        Error::UnsupportedLanguage(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_string(),
        )
    })?;

    let bytes = std::fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    let mut parsed = scan_source(language, &source);
    parsed.path = path.to_path_buf();
    Ok(parsed)
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name))
}

/// Collect scannable source files under `root`, sorted by path.
///
/// `max_depth` bounds directory descent; `None` walks the whole tree.
/// Unreadable entries are logged and skipped.
pub fn discover_source_files(root: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", root.display()),
        )));
    }

    let mut walker = WalkDir::new(root).follow_links(false);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| !is_skipped(e)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || Language::from_path(entry.path()).is_none() {
            continue;
        }
        let too_large = entry
            .metadata()
            .map(|m| m.len() > MAX_SCANNED_FILE_BYTES)
            .unwrap_or(true);
        if too_large {
            tracing::debug!("Skipping large file: {}", entry.path().display());
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}
