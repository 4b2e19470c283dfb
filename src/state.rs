use std::path::PathBuf;

use crate::error::TransferError;

/// A file that reached the temporary directory intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub locator: PathBuf,
    pub content_type: Option<String>,
    pub bytes: u64,
    pub sha256: String,
}

/// Lifecycle of one transfer. `Completed`, `Failed` and `Cancelled` are final.
#[derive(Debug)]
pub enum TransferState {
    Pending,
    InProgress,
    Completed(CompletedTransfer),
    Failed(TransferError),
    Cancelled,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed(_) | TransferState::Failed(_) | TransferState::Cancelled
        )
    }

    pub fn completed(&self) -> Option<&CompletedTransfer> {
        match self {
            TransferState::Completed(c) => Some(c),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransferState::Pending => "pending",
            TransferState::InProgress => "in_progress",
            TransferState::Completed(_) => "completed",
            TransferState::Failed(_) => "failed",
            TransferState::Cancelled => "cancelled",
        }
    }
}

/// Aggregate over a settled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn from_states<'a, I>(states: I) -> Self
    where
        I: IntoIterator<Item = &'a TransferState>,
    {
        let mut summary = BatchSummary::default();
        for state in states {
            match state {
                TransferState::Completed(_) => summary.completed += 1,
                TransferState::Cancelled => summary.cancelled += 1,
                // A state that never settled counts against the batch.
                _ => summary.failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }

    /// Failures as the user sees them: cancelled files did not arrive either.
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.cancelled
    }

    pub fn body(&self) -> String {
        let failures = self.unsuccessful();
        if failures == 0 {
            format!("{} file(s) downloaded successfully.", self.completed)
        } else if self.completed > 0 {
            format!("{} succeeded, {} failed.", self.completed, failures)
        } else {
            format!("{} failed.", failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done() -> TransferState {
        TransferState::Completed(CompletedTransfer {
            locator: PathBuf::from("/tmp/a"),
            content_type: None,
            bytes: 1,
            sha256: String::new(),
        })
    }

    #[test]
    fn summary_counts_every_state() {
        let states = vec![
            done(),
            TransferState::Failed(TransferError::SizeUnknown),
            TransferState::Cancelled,
            done(),
        ];
        let summary = BatchSummary::from_states(&states);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.total(), states.len());
    }

    #[test]
    fn summary_body_phrasing() {
        let all_ok = BatchSummary {
            completed: 3,
            ..Default::default()
        };
        assert_eq!(all_ok.body(), "3 file(s) downloaded successfully.");

        let mixed = BatchSummary {
            completed: 2,
            failed: 1,
            cancelled: 1,
        };
        assert_eq!(mixed.body(), "2 succeeded, 2 failed.");

        let none = BatchSummary {
            completed: 0,
            failed: 2,
            cancelled: 0,
        };
        assert_eq!(none.body(), "2 failed.");
    }

    #[test]
    fn terminal_states() {
        assert!(!TransferState::Pending.is_terminal());
        assert!(!TransferState::InProgress.is_terminal());
        assert!(TransferState::Cancelled.is_terminal());
        assert!(done().is_terminal());
        assert_eq!(done().label(), "completed");
    }
}
