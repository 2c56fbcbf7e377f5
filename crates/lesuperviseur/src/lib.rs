// lesuperviseur - Phase Supervision
//
// *Le Superviseur* (The Supervisor) - Retry, timeout and fallback semantics for every pipeline phase

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Supervisor error taxonomy.
pub mod error;
/// Retry/timeout policy.
pub mod policy;
/// Operation records and supervisor state.
pub mod state;
/// The supervisor itself.
pub mod supervisor;

pub use error::SupervisorError;
pub use policy::RetryPolicy;
pub use state::{OperationRecord, OperationStatus, SupervisorState};
pub use supervisor::{OrchestrationSupervisor, Supervised};

/// Re-exported so callers can build operations without depending on tokio-util directly.
pub use tokio_util::sync::CancellationToken;

/// Supervisor library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
