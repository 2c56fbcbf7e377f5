use serde::{Deserialize, Serialize};

/// Terminal status of one supervised operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    /// Operation produced a value within the attempt ceiling.
    Succeeded,
    /// Every attempt failed or timed out; the fallback was substituted.
    FellBack,
    /// The supervisor was shut down; the fallback was substituted.
    Cancelled,
}

/// Record of one supervised operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Operation name given by the caller.
    pub name: String,
    /// Terminal status.
    pub status: OperationStatus,
    /// Number of attempts actually started.
    pub attempts: usize,
    /// Last failure message, if any attempt failed.
    pub last_error: Option<String>,
    /// Wall-clock time spent, including backoff.
    pub elapsed_ms: u64,
}

impl OperationRecord {
    /// True if the caller received the fallback value.
    pub fn used_fallback(&self) -> bool {
        self.status != OperationStatus::Succeeded
    }
}

/// Accumulated records for every operation run by one supervisor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorState {
    records: Vec<OperationRecord>,
}

impl SupervisorState {
    /// Append a record.
    pub fn record(&mut self, record: OperationRecord) {
        self.records.push(record);
    }

    /// All records in completion order.
    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    /// Records whose caller received a fallback.
    pub fn fallbacks(&self) -> impl Iterator<Item = &OperationRecord> {
        self.records.iter().filter(|r| r.used_fallback())
    }

    /// Number of operations that succeeded.
    pub fn succeeded(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == OperationStatus::Succeeded)
            .count()
    }

    /// True if any operation fell back.
    pub fn is_degraded(&self) -> bool {
        self.fallbacks().next().is_some()
    }

    /// Total attempts across all operations.
    pub fn total_attempts(&self) -> usize {
        self.records.iter().map(|r| r.attempts).sum()
    }

    /// Clear all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: OperationStatus, attempts: usize) -> OperationRecord {
        OperationRecord {
            name: name.to_string(),
            status,
            attempts,
            last_error: None,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn degraded_when_any_fallback_recorded() {
        let mut state = SupervisorState::default();
        state.record(record("semantic", OperationStatus::Succeeded, 1));
        assert!(!state.is_degraded());

        state.record(record("structural", OperationStatus::FellBack, 3));
        assert!(state.is_degraded());
        assert_eq!(state.succeeded(), 1);
        assert_eq!(state.total_attempts(), 4);
        assert_eq!(state.fallbacks().count(), 1);
    }

    #[test]
    fn cancelled_counts_as_fallback() {
        let rec = record("graph", OperationStatus::Cancelled, 0);
        assert!(rec.used_fallback());
    }

    #[test]
    fn clear_resets_records() {
        let mut state = SupervisorState::default();
        state.record(record("a", OperationStatus::Succeeded, 1));
        state.clear();
        assert!(state.records().is_empty());
    }
}
