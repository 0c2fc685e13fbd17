//! Run report: every transfer outcome, aggregated.
//!
//! The subprocess stage never aborts the run, so its failures have to
//! surface somewhere: they land here, one [`TransferOutcome`] per
//! invocation, and the driver decides what to do with the totals.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one style-transfer subprocess invocation.
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub style_index: u32,
    pub prompt_id: String,
    /// Index of the worker that ran the command (0-based).
    pub worker_id: usize,
    /// Device the process was pinned to.
    pub device: u32,
    /// Exit code, or `None` when the process was killed by a signal or
    /// never started.
    pub exit_code: Option<i32>,
    /// Full captured standard output.
    pub stdout: String,
    /// Full captured standard error.
    pub stderr: String,
    pub duration_ms: u64,
}

impl TransferOutcome {
    /// Whether the invocation completed with exit code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Aggregate outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Images generated and saved by the producer.
    pub images_generated: usize,
    /// Transfer orders handed to the queue (equals `images_generated`
    /// unless the run was aborted mid-style).
    pub orders_submitted: usize,
    pub transfers: Vec<TransferOutcome>,
}

impl RunReport {
    pub fn succeeded_transfers(&self) -> usize {
        self.transfers.iter().filter(|t| t.success()).count()
    }

    pub fn failed_transfers(&self) -> usize {
        self.transfers.len() - self.succeeded_transfers()
    }

    /// A run is clean when every submitted order was consumed and every
    /// transfer exited 0.
    pub fn is_clean(&self) -> bool {
        self.failed_transfers() == 0 && self.transfers.len() == self.orders_submitted
    }

    /// One-line summary for the driver log.
    pub fn summary(&self) -> String {
        format!(
            "{} generated, {} transfers ({} ok, {} failed) in {}s",
            self.images_generated,
            self.transfers.len(),
            self.succeeded_transfers(),
            self.failed_transfers(),
            (self.finished_at - self.started_at).num_seconds(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
