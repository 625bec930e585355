//! The `Result` model returned by a mod job: status lattice, per-edit
//! outcomes, and accepted/rejected commit message lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a mod job.
///
/// Transitions are monotonic: `Queued -> Processing -> {Success, Partial,
/// Failed, Error}`, derived from the accepted/rejected commit lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Processing,
    Success,
    Partial,
    Failed,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failed => "failed",
            Status::Error => "error",
        }
    }

    /// Derive the terminal status from the accepted/rejected commit counts:
    /// SUCCESS iff rejected is empty and accepted is non-empty; PARTIAL iff
    /// both non-empty; FAILED iff accepted is empty.
    pub fn from_counts(accepted: usize, rejected: usize) -> Status {
        match (accepted > 0, rejected > 0) {
            (true, false) => Status::Success,
            (true, true) => Status::Partial,
            (false, _) => Status::Failed,
        }
    }
}

/// Per-edit validation outcome (file + accept/reject).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOutcome {
    pub file: String,
    pub valid: bool,
}

/// The aggregate Result of a mod job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModResult {
    pub mod_id: Uuid,
    pub status: Status,
    pub message: String,
    #[serde(default)]
    pub validation_results: Vec<EditOutcome>,
    #[serde(default)]
    pub accepted_commits: Vec<String>,
    #[serde(default)]
    pub rejected_commits: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ModResult {
    pub fn queued(mod_id: Uuid) -> Self {
        Self {
            mod_id,
            status: Status::Queued,
            message: "queued".to_string(),
            validation_results: Vec::new(),
            accepted_commits: Vec::new(),
            rejected_commits: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn processing(mod_id: Uuid) -> Self {
        Self {
            status: Status::Processing,
            message: "processing".to_string(),
            timestamp: Utc::now(),
            ..Self::queued(mod_id)
        }
    }

    pub fn error(mod_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            timestamp: Utc::now(),
            ..Self::queued(mod_id)
        }
    }

    /// Build the terminal result of an `AtomicCommitEngine` run from its
    /// accumulated per-edit outcomes.
    pub fn from_engine_run(
        mod_id: Uuid,
        message: impl Into<String>,
        validation_results: Vec<EditOutcome>,
        accepted_commits: Vec<String>,
        rejected_commits: Vec<String>,
    ) -> Self {
        let status = Status::from_counts(accepted_commits.len(), rejected_commits.len());
        Self {
            mod_id,
            status,
            message: message.into(),
            validation_results,
            accepted_commits,
            rejected_commits,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lattice_matches_accept_reject_counts() {
        assert_eq!(Status::from_counts(0, 0), Status::Failed);
        assert_eq!(Status::from_counts(0, 3), Status::Failed);
        assert_eq!(Status::from_counts(2, 0), Status::Success);
        assert_eq!(Status::from_counts(1, 1), Status::Partial);
    }

    #[test]
    fn queued_result_has_no_commits() {
        let id = Uuid::new_v4();
        let r = ModResult::queued(id);
        assert_eq!(r.status, Status::Queued);
        assert!(r.accepted_commits.is_empty());
        assert!(r.rejected_commits.is_empty());
    }
}
