use std::path::Path;

/// Normalize a provider-reported path to a project-relative, forward-slash form.
///
/// Absolute paths under `root` lose the root prefix; a leading `./` is dropped.
pub fn normalize_path(root: &Path, raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let root = root.to_string_lossy().replace('\\', "/");
    let root = root.trim_end_matches('/');

    let mut relative = unified.as_str();
    if !root.is_empty() && root != "." {
        if let Some(rest) = relative.strip_prefix(root) {
            if rest.is_empty() || rest.starts_with('/') {
                relative = rest;
            }
        }
    }

    let mut relative = relative.trim_start_matches('/');
    while let Some(rest) = relative.strip_prefix("./") {
        relative = rest;
    }
    relative.to_string()
}

/// True if two normalized paths refer to the same file.
///
/// Either side may be a suffix of the other when one is more qualified
/// (`pkg/src/a.ts` vs `src/a.ts`); the match must fall on a segment boundary.
pub fn same_file(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    long.ends_with(short) && long[..long.len() - short.len()].ends_with('/')
}
