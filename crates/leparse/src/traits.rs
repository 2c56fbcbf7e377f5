// Core types for symbol and import scanning

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result type for scanning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during scanning
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The language is not supported
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Input/Output error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Kind of a declared symbol
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Class declaration
    Class,
    /// Struct or Go struct type
    Struct,
    /// Enum declaration
    Enum,
    /// Interface declaration
    Interface,
    /// Rust trait
    Trait,
    /// Function, method or arrow function bound to a name
    Function,
}

impl SymbolKind {
    /// True for type-like declarations (class, struct, enum).
    pub fn is_type(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Enum)
    }

    /// True for contract-like declarations (interface, trait).
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Interface | Self::Trait)
    }
}

/// A symbol declared in a file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    /// Symbol name
    pub name: String,
    /// Declaration kind
    pub kind: SymbolKind,
    /// 1-indexed declaration line
    pub line: usize,
}

/// Import information extracted from a file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportInfo {
    /// Imported path (module specifier, dotted module, or Rust path)
    pub path: String,

    /// 1-indexed line of the import
    pub line: usize,
}

impl ImportInfo {
    /// True if the import names a file relative to the importer.
    ///
    /// Covers `./x` and `../x` specifiers, Python relative imports (`.x`),
    /// and Rust `mod` / `self::` / `super::` paths.
    pub fn is_relative(&self) -> bool {
        self.path.starts_with('.')
            || self.path.starts_with("self::")
            || self.path.starts_with("super::")
            || self.path.starts_with("crate::")
    }
}

/// Scan output for one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedFile {
    /// File path as given to the scanner
    pub path: PathBuf,
    /// Language name
    pub language: String,
    /// Declared symbols in source order
    pub symbols: Vec<Symbol>,
    /// Imports in source order
    pub imports: Vec<ImportInfo>,
}
