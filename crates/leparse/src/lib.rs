// leparse - Source Scanning Engine
//
// *Le Parse* (The Parsing) - Lightweight symbol and import extraction across languages

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Core scanning types and errors.
pub mod traits;

/// Supported languages and their scanning patterns.
pub mod languages;

/// Single-file and directory scanning.
pub mod scanner;

/// Parallel scanning implementation.
pub mod parallel;

/// Re-exports of commonly used types.
pub mod prelude;

/// Library initialization.
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
