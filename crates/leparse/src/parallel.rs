// Parallel file scanning with rayon

use crate::scanner::scan_file;
use crate::traits::ParsedFile;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Result of scanning a single file
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Path to the scanned file
    pub file_path: PathBuf,

    /// Scan output (None if scanning failed)
    pub parsed: Option<ParsedFile>,

    /// Scanning error (if any)
    pub error: Option<String>,

    /// Time taken to scan this file (milliseconds)
    pub scan_time_ms: u64,
}

impl ScanResult {
    fn success(file_path: PathBuf, parsed: ParsedFile, scan_time_ms: u64) -> Self {
        Self {
            file_path,
            parsed: Some(parsed),
            error: None,
            scan_time_ms,
        }
    }

    fn failure(file_path: PathBuf, error: String) -> Self {
        Self {
            file_path,
            parsed: None,
            error: Some(error),
            scan_time_ms: 0,
        }
    }

    /// Check if scanning was successful
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Statistics from a parallel scan
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Total number of files processed
    pub total_files: usize,

    /// Files scanned successfully
    pub successful_files: usize,

    /// Files that failed
    pub failed_files: usize,

    /// Symbols found across all files
    pub total_symbols: usize,

    /// Imports found across all files
    pub total_imports: usize,

    /// Wall time for the whole scan (milliseconds)
    pub total_time_ms: u64,
}

impl ScanStats {
    fn from_results(results: &[ScanResult], total_time_ms: u64) -> Self {
        let parsed = results.iter().filter_map(|r| r.parsed.as_ref());
        let (total_symbols, total_imports) = parsed.fold((0, 0), |(s, i), p| {
            (s + p.symbols.len(), i + p.imports.len())
        });
        let successful_files = results.iter().filter(|r| r.is_success()).count();

        Self {
            total_files: results.len(),
            successful_files,
            failed_files: results.len() - successful_files,
            total_symbols,
            total_imports,
            total_time_ms,
        }
    }
}

/// Scans many files concurrently on the rayon pool.
///
/// Output order matches input order.
#[derive(Debug, Clone, Default)]
pub struct ParallelScanner {
    max_threads: Option<usize>,
}

impl ParallelScanner {
    /// Scanner on the global rayon pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit scanning to a dedicated pool of `max_threads` workers
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = Some(max_threads.max(1));
        self
    }

    /// Scan files in parallel
    pub fn scan_files(&self, file_paths: Vec<PathBuf>) -> Vec<ScanResult> {
        self.scan_files_with_stats(file_paths).0
    }

    /// Scan files in parallel, returning per-file results and totals
    pub fn scan_files_with_stats(&self, file_paths: Vec<PathBuf>) -> (Vec<ScanResult>, ScanStats) {
        let start = Instant::now();

        let scan_all = move || -> Vec<ScanResult> {
            file_paths.into_par_iter().map(scan_one).collect()
        };

        let pool = self.max_threads.and_then(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| tracing::warn!("Falling back to global pool: {}", e))
                .ok()
        });
        let results = match pool {
            Some(pool) => pool.install(scan_all),
            None => scan_all(),
        };

        let stats = ScanStats::from_results(&results, start.elapsed().as_millis() as u64);
        tracing::info!(
            "Scanned {} files: {} successful, {} failed, {} symbols, {} imports",
            stats.total_files,
            stats.successful_files,
            stats.failed_files,
            stats.total_symbols,
            stats.total_imports
        );

        (results, stats)
    }
}

fn scan_one(path: PathBuf) -> ScanResult {
    let start = Instant::now();
    match scan_file(&path) {
        Ok(parsed) => ScanResult::success(path, parsed, start.elapsed().as_millis() as u64),
        Err(e) => ScanResult::failure(path, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scans_mixed_files_in_order() {
        let dir = tempdir().unwrap();
        let py = dir.path().join("app.py");
        let rs = dir.path().join("lib.rs");
        let txt = dir.path().join("notes.txt");
        fs::write(&py, "def hello():\n    pass\n").unwrap();
        fs::write(&rs, "mod cache;\nfn main() {}\n").unwrap();
        fs::write(&txt, "plain").unwrap();

        let (results, stats) = ParallelScanner::new()
            .with_max_threads(2)
            .scan_files_with_stats(vec![py.clone(), rs.clone(), txt.clone()]);

        let paths: Vec<_> = results.iter().map(|r| r.file_path.clone()).collect();
        assert_eq!(paths, vec![py, rs, txt]);
        assert!(results[0].is_success());
        assert!(!results[2].is_success());

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.successful_files, 2);
        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.total_symbols, 2);
        assert_eq!(stats.total_imports, 1);
    }

    #[test]
    fn missing_file_is_a_failure() {
        let results = ParallelScanner::new().scan_files(vec![PathBuf::from("/nonexistent/x.ts")]);
        assert_eq!(results.len(), 1);
        assert!(results[0].error.is_some());
    }
}
