// Error Handling
//
// *La Gestion des Erreurs* (The Error Management) - Orchestration error taxonomy

use crate::config::ConfigError;
use leplanification::PlanningError;
use lesuperviseur::SupervisorError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for orchestration calls
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// Errors an orchestration call can raise.
///
/// Provider failures during discovery never appear here; they degrade the
/// result instead.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A required provider could not be started
    #[error("Initialization error: {0}")]
    Initialization(#[from] SupervisorError),

    /// The task graph failed validation
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// The request names a project the orchestrator is not bound to
    #[error("Project mismatch: orchestrator serves {bound:?}, request targets {requested:?}")]
    ProjectMismatch {
        /// Root the providers were built over
        bound: PathBuf,
        /// Root named by the request
        requested: PathBuf,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
        /// How to fix it
        suggestion: Option<String>,
    },

    /// I/O errors with context
    #[error("I/O error: {context} (path: {path:?})")]
    Io {
        /// Operation that failed
        context: String,
        /// Path involved, if any
        path: Option<PathBuf>,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl OrchestrationError {
    /// Create a config error
    pub fn config_error(message: impl Into<String>, suggestion: Option<String>) -> Self {
        OrchestrationError::Config {
            message: message.into(),
            suggestion,
        }
    }

    /// Create an I/O error with context
    pub fn io_error(
        context: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        OrchestrationError::Io {
            context: context.into(),
            path,
            source,
        }
    }

    /// Check if retrying the call could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            OrchestrationError::Initialization(SupervisorError::Cancelled { .. }) => false,
            OrchestrationError::Initialization(_) => true,
            OrchestrationError::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            OrchestrationError::Planning(_)
            | OrchestrationError::ProjectMismatch { .. }
            | OrchestrationError::Config { .. } => false,
        }
    }

    /// Get a suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            OrchestrationError::Initialization(err) => Some(format!(
                "Check that '{}' can reach the project, or raise supervisor.init_attempts / supervisor.attempt_timeout_ms",
                err.service()
            )),
            OrchestrationError::Planning(_) => {
                Some("This is a planner defect; please report it with the request text".to_string())
            }
            OrchestrationError::ProjectMismatch { requested, .. } => Some(format!(
                "Create a separate orchestrator for {} (leplan --project {})",
                requested.display(),
                requested.display()
            )),
            OrchestrationError::Config { suggestion, .. } => suggestion.clone(),
            OrchestrationError::Io { path, .. } => path
                .as_ref()
                .map(|p| format!("Check that {} exists and is readable", p.display())),
        }
    }
}

/// Render an error for the terminal, with its suggestion
pub fn format_error(error: &OrchestrationError) -> String {
    let mut message = error.to_string();

    if let Some(suggestion) = error.suggestion() {
        message.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }
    if error.is_recoverable() {
        message.push_str("\n\nThis may be transient; running the command again can succeed.");
    }

    message
}

impl From<ConfigError> for OrchestrationError {
    fn from(err: ConfigError) -> Self {
        let suggestion = match &err {
            ConfigError::Parse(_) => "Check LEPLAN_* environment variables for non-numeric values",
            ConfigError::Invalid(_) => "Fix the value in .leplan/config.toml or run `leplan config --write` for defaults",
        };
        OrchestrationError::config_error(err.to_string(), Some(suggestion.to_string()))
    }
}
