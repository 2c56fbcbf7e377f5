use std::future::Future;
use std::sync::Mutex;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::policy::RetryPolicy;
use crate::state::{OperationRecord, OperationStatus, SupervisorState};

/// Value produced by a supervised call together with its record.
#[derive(Debug, Clone)]
pub struct Supervised<T> {
    /// Operation result, or the fallback.
    pub value: T,
    /// How the value was obtained.
    pub record: OperationRecord,
}

impl<T> Supervised<T> {
    /// True if `value` is the fallback.
    pub fn is_fallback(&self) -> bool {
        self.record.used_fallback()
    }

    /// Discard the record.
    pub fn into_value(self) -> T {
        self.value
    }
}

enum Outcome<T> {
    Succeeded(T),
    Exhausted,
    Cancelled,
}

struct AttemptSummary<T> {
    outcome: Outcome<T>,
    attempts: usize,
    last_error: Option<String>,
}

/// Generic retry/timeout/fallback wrapper used by every pipeline phase.
///
/// Each attempt receives a child of the supervisor's shutdown token. When an
/// attempt times out its token is cancelled and its future is dropped, so the
/// operation never keeps running unobserved in the background.
pub struct OrchestrationSupervisor {
    policy: RetryPolicy,
    shutdown: CancellationToken,
    state: Mutex<SupervisorState>,
}

impl Default for OrchestrationSupervisor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for OrchestrationSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationSupervisor")
            .field("policy", &self.policy)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl OrchestrationSupervisor {
    /// Create a supervisor with a default policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            shutdown: CancellationToken::new(),
            state: Mutex::new(SupervisorState::default()),
        }
    }

    /// Tie the supervisor to an external shutdown token.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Default policy used by [`run`](Self::run).
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Token that stops all further attempts when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run `operation` under the default policy, returning `fallback` if it never succeeds.
    pub async fn run<T, F, Fut>(&self, name: &str, operation: F, fallback: T) -> Supervised<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.run_with(name, self.policy, operation, fallback).await
    }

    /// Run `operation` under an explicit policy.
    ///
    /// Never fails: exhaustion and shutdown both resolve to `fallback`, and the
    /// failure is recorded in the supervisor state.
    pub async fn run_with<T, F, Fut>(
        &self,
        name: &str,
        policy: RetryPolicy,
        operation: F,
        fallback: T,
    ) -> Supervised<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let started = Instant::now();
        let summary = self.attempt(name, policy, operation).await;

        let (value, status) = match summary.outcome {
            Outcome::Succeeded(value) => (value, OperationStatus::Succeeded),
            Outcome::Exhausted => {
                warn!(
                    "{} failed after {} attempt(s), using fallback: {}",
                    name,
                    summary.attempts,
                    summary.last_error.as_deref().unwrap_or("unknown error")
                );
                (fallback, OperationStatus::FellBack)
            }
            Outcome::Cancelled => {
                warn!("{} cancelled by shutdown, using fallback", name);
                (fallback, OperationStatus::Cancelled)
            }
        };

        let record = OperationRecord {
            name: name.to_string(),
            status,
            attempts: summary.attempts,
            last_error: summary.last_error,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        self.push(record.clone());

        Supervised { value, record }
    }

    /// Bring up a required service.
    ///
    /// Unlike [`run`](Self::run) this is fatal: a service that cannot start
    /// within the attempt ceiling yields [`SupervisorError::InitializationFailed`].
    pub async fn initialize<F, Fut>(
        &self,
        service: &str,
        policy: RetryPolicy,
        init: F,
    ) -> Result<(), SupervisorError>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let started = Instant::now();
        let name = format!("initialize:{service}");
        let summary = self.attempt(&name, policy, init).await;

        let status = match summary.outcome {
            Outcome::Succeeded(()) => OperationStatus::Succeeded,
            Outcome::Exhausted => OperationStatus::FellBack,
            Outcome::Cancelled => OperationStatus::Cancelled,
        };
        self.push(OperationRecord {
            name,
            status,
            attempts: summary.attempts,
            last_error: summary.last_error.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        match status {
            OperationStatus::Succeeded => {
                info!("{} ready after {} attempt(s)", service, summary.attempts);
                Ok(())
            }
            OperationStatus::Cancelled => Err(SupervisorError::Cancelled {
                service: service.to_string(),
            }),
            OperationStatus::FellBack => Err(SupervisorError::InitializationFailed {
                service: service.to_string(),
                attempts: summary.attempts,
                last_error: summary
                    .last_error
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }

    /// Copy of the accumulated operation records.
    pub fn snapshot(&self) -> SupervisorState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drop all accumulated records.
    pub fn reset(&self) {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn push(&self, record: OperationRecord) {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(record);
    }

    async fn attempt<T, F, Fut>(
        &self,
        name: &str,
        policy: RetryPolicy,
        mut operation: F,
    ) -> AttemptSummary<T>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = policy.attempts();
        let mut attempts = 0;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if self.shutdown.is_cancelled() {
                return AttemptSummary {
                    outcome: Outcome::Cancelled,
                    attempts,
                    last_error,
                };
            }

            attempts = attempt;
            let token = self.shutdown.child_token();
            debug!("{} attempt {}/{}", name, attempt, max_attempts);

            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    token.cancel();
                    return AttemptSummary {
                        outcome: Outcome::Cancelled,
                        attempts,
                        last_error,
                    };
                }
                result = tokio::time::timeout(policy.attempt_timeout(), operation(token.clone())) => result,
            };

            match result {
                Ok(Ok(value)) => {
                    return AttemptSummary {
                        outcome: Outcome::Succeeded(value),
                        attempts,
                        last_error,
                    };
                }
                Ok(Err(err)) => {
                    warn!("{} attempt {} failed: {:#}", name, attempt, err);
                    last_error = Some(format!("{err:#}"));
                }
                Err(_) => {
                    token.cancel();
                    warn!(
                        "{} attempt {} timed out after {} ms",
                        name, attempt, policy.attempt_timeout_ms
                    );
                    last_error = Some(format!(
                        "timed out after {} ms",
                        policy.attempt_timeout_ms
                    ));
                }
            }

            if attempt < max_attempts {
                let delay = policy.delay_after(attempt);
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => {
                        return AttemptSummary {
                            outcome: Outcome::Cancelled,
                            attempts,
                            last_error,
                        };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        AttemptSummary {
            outcome: Outcome::Exhausted,
            attempts,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, 200).with_base_delay(1)
    }

    #[tokio::test]
    async fn returns_value_on_first_success() {
        let supervisor = OrchestrationSupervisor::new(fast_policy(3));
        let result = supervisor
            .run("ok", |_| async { Ok(7u32) }, 0)
            .await;

        assert_eq!(result.value, 7);
        assert!(!result.is_fallback());
        assert_eq!(result.record.attempts, 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let supervisor = OrchestrationSupervisor::new(fast_policy(3));

        let counter = calls.clone();
        let result = supervisor
            .run(
                "flaky",
                move |_| {
                    let counter = counter.clone();
                    async move {
                        let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        if current < 2 {
                            Err(anyhow!("transient error"))
                        } else {
                            Ok("done")
                        }
                    }
                },
                "fallback",
            )
            .await;

        assert_eq!(result.value, "done");
        assert_eq!(result.record.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            result.record.last_error.as_deref(),
            Some("transient error")
        );
    }

    #[tokio::test]
    async fn permanently_failing_operation_respects_attempt_ceiling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let supervisor = OrchestrationSupervisor::new(fast_policy(3));

        let counter = calls.clone();
        let result = supervisor
            .run(
                "broken",
                move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err::<Vec<String>, _>(anyhow!("provider down"))
                    }
                },
                Vec::new(),
            )
            .await;

        assert!(result.value.is_empty());
        assert!(result.is_fallback());
        assert_eq!(result.record.status, OperationStatus::FellBack);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(supervisor.snapshot().is_degraded());
    }

    #[tokio::test]
    async fn timeout_cancels_attempt_token_and_falls_back() {
        let seen = Arc::new(Mutex::new(Vec::<CancellationToken>::new()));
        let supervisor = OrchestrationSupervisor::new(RetryPolicy::new(2, 20).with_base_delay(1));

        let tokens = seen.clone();
        let result = supervisor
            .run(
                "slow",
                move |token| {
                    tokens.lock().expect("lock").push(token);
                    async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok(1u8)
                    }
                },
                0,
            )
            .await;

        assert_eq!(result.value, 0);
        assert_eq!(result.record.attempts, 2);
        assert!(result
            .record
            .last_error
            .as_deref()
            .unwrap_or_default()
            .contains("timed out"));

        let tokens = seen.lock().expect("lock");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.is_cancelled()));
    }

    #[tokio::test]
    async fn backoff_waits_linearly_between_attempts() {
        let supervisor = OrchestrationSupervisor::new(RetryPolicy::new(3, 100).with_base_delay(20));
        let started = Instant::now();

        let _ = supervisor
            .run("failing", |_| async { Err::<(), _>(anyhow!("nope")) }, ())
            .await;

        // 1 * 20 + 2 * 20
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn shutdown_stops_retries() {
        let shutdown = CancellationToken::new();
        let supervisor = OrchestrationSupervisor::new(RetryPolicy::new(5, 1_000).with_base_delay(500))
            .with_shutdown(shutdown.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let trigger = shutdown.clone();
        let result = supervisor
            .run(
                "cancel-me",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    trigger.cancel();
                    async { Err::<u8, _>(anyhow!("failed once")) }
                },
                9,
            )
            .await;

        assert_eq!(result.value, 9);
        assert_eq!(result.record.status, OperationStatus::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initialize_failure_is_fatal() {
        let supervisor = OrchestrationSupervisor::default();
        let err = supervisor
            .initialize("graph-service", fast_policy(2), |_| async {
                Err(anyhow!("connection refused"))
            })
            .await
            .expect_err("must fail");

        match err {
            SupervisorError::InitializationFailed {
                service,
                attempts,
                last_error,
            } => {
                assert_eq!(service, "graph-service");
                assert_eq!(attempts, 2);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn initialize_success_is_recorded() {
        let supervisor = OrchestrationSupervisor::default();
        supervisor
            .initialize("discovery", fast_policy(3), |_| async { Ok(()) })
            .await
            .expect("init");

        let state = supervisor.snapshot();
        assert_eq!(state.records().len(), 1);
        assert_eq!(state.records()[0].name, "initialize:discovery");
        assert_eq!(state.succeeded(), 1);
    }

    #[tokio::test]
    async fn reset_clears_records() {
        let supervisor = OrchestrationSupervisor::new(fast_policy(1));
        let _ = supervisor.run("one", |_| async { Ok(()) }, ()).await;
        supervisor.reset();
        assert!(supervisor.snapshot().records().is_empty());
    }
}
