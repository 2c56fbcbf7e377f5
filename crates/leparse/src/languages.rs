// Per-language scanning patterns

use crate::traits::SymbolKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// TypeScript (`.ts`, `.tsx`, `.mts`, `.cts`)
    TypeScript,
    /// JavaScript (`.js`, `.jsx`, `.mjs`, `.cjs`)
    JavaScript,
    /// Python
    Python,
    /// Rust
    Rust,
    /// Go
    Go,
}

impl Language {
    /// All supported languages.
    pub const ALL: [Language; 5] = [
        Self::TypeScript,
        Self::JavaScript,
        Self::Python,
        Self::Rust,
        Self::Go,
    ];

    /// Detect from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "py" | "pyi" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    /// Detect from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse a language name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Some(Self::TypeScript),
            "javascript" | "js" => Some(Self::JavaScript),
            "python" | "py" => Some(Self::Python),
            "rust" | "rs" => Some(Self::Rust),
            "go" | "golang" => Some(Self::Go),
            _ => None,
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript",
            Self::JavaScript => "JavaScript",
            Self::Python => "Python",
            Self::Rust => "Rust",
            Self::Go => "Go",
        }
    }

    /// Extensions tried when resolving an extensionless relative import.
    pub fn resolution_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::TypeScript | Self::JavaScript => &["ts", "tsx", "js", "jsx", "mjs", "cjs"],
            Self::Python => &["py"],
            Self::Rust => &["rs"],
            Self::Go => &["go"],
        }
    }

    /// Index file names tried when an import names a directory.
    pub fn index_files(&self) -> &'static [&'static str] {
        match self {
            Self::TypeScript | Self::JavaScript => &["index.ts", "index.tsx", "index.js"],
            Self::Python => &["__init__.py"],
            Self::Rust => &["mod.rs"],
            Self::Go => &[],
        }
    }

    /// Compiled scanning patterns.
    pub fn config(&self) -> &'static LanguageConfig {
        match self {
            Self::TypeScript | Self::JavaScript => &ECMASCRIPT,
            Self::Python => &PYTHON,
            Self::Rust => &RUST,
            Self::Go => &GO,
        }
    }
}

/// Scanning patterns for one language family.
///
/// Symbol patterns capture the declared name in group 1. Import patterns
/// capture the imported path in group 1.
#[derive(Debug)]
pub struct LanguageConfig {
    /// Symbol patterns with the kind they declare
    pub symbols: Vec<(SymbolKind, Regex)>,
    /// Import patterns
    pub imports: Vec<Regex>,
    /// Grouped import syntax, such as Go's `import ( ... )`
    pub import_block: Option<ImportBlock>,
}

/// A grouped import form: `block` captures the body in group 1, `entry`
/// captures each imported path inside that body.
#[derive(Debug)]
pub struct ImportBlock {
    /// Matches the whole group
    pub block: Regex,
    /// Matches one entry within the group body
    pub entry: Regex,
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in scanning pattern compiles")
}

static ECMASCRIPT: Lazy<LanguageConfig> = Lazy::new(|| LanguageConfig {
    symbols: vec![
        (
            SymbolKind::Class,
            pattern(r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)"),
        ),
        (
            SymbolKind::Interface,
            pattern(r"(?m)^[ \t]*(?:export[ \t]+)?(?:declare[ \t]+)?interface[ \t]+([A-Za-z_$][\w$]*)"),
        ),
        (
            SymbolKind::Enum,
            pattern(r"(?m)^[ \t]*(?:export[ \t]+)?(?:const[ \t]+)?enum[ \t]+([A-Za-z_$][\w$]*)"),
        ),
        (
            SymbolKind::Function,
            pattern(r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function[ \t]*\*?[ \t]*([A-Za-z_$][\w$]*)"),
        ),
        (
            SymbolKind::Function,
            pattern(r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]+)?(?:\([^)\n]*\)|[A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=>"),
        ),
    ],
    imports: vec![
        pattern(r#"(?m)^[ \t]*(?:import|export)[ \t]+(?:type[ \t]+)?(?:[^'";\n]*?[ \t]+from[ \t]+)?['"]([^'"\n]+)['"]"#),
        pattern(r#"\brequire\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#),
        pattern(r#"\bimport\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#),
    ],
    import_block: None,
});

static PYTHON: Lazy<LanguageConfig> = Lazy::new(|| LanguageConfig {
    symbols: vec![
        (
            SymbolKind::Class,
            pattern(r"(?m)^[ \t]*class[ \t]+([A-Za-z_]\w*)"),
        ),
        (
            SymbolKind::Function,
            pattern(r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)"),
        ),
    ],
    imports: vec![
        pattern(r"(?m)^[ \t]*from[ \t]+([.\w]+)[ \t]+import\b"),
        pattern(r"(?m)^[ \t]*import[ \t]+([\w.]+)"),
    ],
    import_block: None,
});

static RUST: Lazy<LanguageConfig> = Lazy::new(|| LanguageConfig {
    symbols: vec![
        (
            SymbolKind::Struct,
            pattern(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:struct|union)[ \t]+([A-Za-z_]\w*)"),
        ),
        (
            SymbolKind::Enum,
            pattern(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?enum[ \t]+([A-Za-z_]\w*)"),
        ),
        (
            SymbolKind::Trait,
            pattern(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:unsafe[ \t]+)?trait[ \t]+([A-Za-z_]\w*)"),
        ),
        (
            SymbolKind::Function,
            pattern(r#"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:const[ \t]+)?(?:async[ \t]+)?(?:unsafe[ \t]+)?(?:extern[ \t]+"[^"]*"[ \t]+)?fn[ \t]+([A-Za-z_]\w*)"#),
        ),
    ],
    imports: vec![
        pattern(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?use[ \t]+((?:crate|self|super)(?:::\w+)+)"),
        pattern(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?mod[ \t]+([A-Za-z_]\w*)[ \t]*;"),
    ],
    import_block: None,
});

static GO: Lazy<LanguageConfig> = Lazy::new(|| LanguageConfig {
    symbols: vec![
        (
            SymbolKind::Struct,
            pattern(r"(?m)^[ \t]*type[ \t]+([A-Za-z_]\w*)[ \t]+struct\b"),
        ),
        (
            SymbolKind::Interface,
            pattern(r"(?m)^[ \t]*type[ \t]+([A-Za-z_]\w*)[ \t]+interface\b"),
        ),
        (
            SymbolKind::Function,
            pattern(r"(?m)^[ \t]*func[ \t]+(?:\([^)]*\)[ \t]*)?([A-Za-z_]\w*)"),
        ),
    ],
    imports: vec![
        pattern(r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"\n]+)""#),
    ],
    import_block: Some(ImportBlock {
        block: pattern(r"(?ms)^[ \t]*import[ \t]*\((.*?)^[ \t]*\)"),
        entry: pattern(r#"(?m)^[ \t]*(?:[\w.]+[ \t]+)?"([^"\n]+)""#),
    }),
});

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ts", Some(Language::TypeScript))]
    #[case("TSX", Some(Language::TypeScript))]
    #[case("mjs", Some(Language::JavaScript))]
    #[case("py", Some(Language::Python))]
    #[case("rs", Some(Language::Rust))]
    #[case("go", Some(Language::Go))]
    #[case("md", None)]
    fn detects_extension(#[case] ext: &str, #[case] expected: Option<Language>) {
        assert_eq!(Language::from_extension(ext), expected);
    }

    #[test]
    fn every_language_compiles_its_patterns() {
        for language in Language::ALL {
            let config = language.config();
            assert!(!config.symbols.is_empty(), "{}", language.name());
            assert!(!config.imports.is_empty(), "{}", language.name());
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!(Language::parse("golang"), Some(Language::Go));
        assert_eq!(Language::parse("Rust"), Some(Language::Rust));
        assert_eq!(Language::parse("cobol"), None);
    }
}
