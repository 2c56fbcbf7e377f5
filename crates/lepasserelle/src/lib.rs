// lepasserelle - Bridge & Integration
//
// *La Passerelle* (The Bridge) - Provider adapters, the planning facade and the `leplan` CLI

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Adapters from the index, graph and scanner crates to the discovery contracts.
pub mod adapters;
/// Command-line interface.
pub mod cli;
/// Project configuration.
pub mod config;
/// Orchestration error taxonomy.
pub mod errors;
/// Text reports.
pub mod format;
/// Planning facade.
pub mod orchestrator;

pub use adapters::{GraphAdapter, KeywordDiscovery, ProjectSnapshot, ProjectWorkspace, ScanAnalyzer};
pub use config::{ConfigError, PlannerConfig};
pub use errors::{format_error, OrchestrationError};
pub use format::TokenFormatter;
pub use orchestrator::{project_id, OrchestrationResult, Orchestrator};

/// Bridge library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
