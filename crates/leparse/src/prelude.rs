// Prelude module - common imports for convenience

pub use crate::languages::{ImportBlock, Language, LanguageConfig};
pub use crate::parallel::{ParallelScanner, ScanResult, ScanStats};
pub use crate::scanner::{discover_source_files, scan_file, scan_source, SKIPPED_DIRECTORIES};
pub use crate::traits::{Error, ImportInfo, ParsedFile, Result, Symbol, SymbolKind};
