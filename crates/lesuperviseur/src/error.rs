use thiserror::Error;

/// Errors raised by the supervisor.
///
/// Operation failures are never surfaced here: `run` always resolves to a value
/// (possibly the fallback). Only service initialization can fail hard.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    /// A required service did not become ready within the attempt ceiling.
    #[error("service '{service}' failed to initialize after {attempts} attempt(s): {last_error}")]
    InitializationFailed {
        /// Service name.
        service: String,
        /// Attempts consumed.
        attempts: usize,
        /// Last error observed.
        last_error: String,
    },

    /// The supervisor was shut down while a service was initializing.
    #[error("supervisor shut down while initializing '{service}'")]
    Cancelled {
        /// Service name.
        service: String,
    },
}

impl SupervisorError {
    /// Name of the service the error refers to.
    pub fn service(&self) -> &str {
        match self {
            Self::InitializationFailed { service, .. } | Self::Cancelled { service } => service,
        }
    }
}
