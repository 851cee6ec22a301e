//! Replay of recorded device commands.
//!
//! Selected execution log entries are resubmitted to a dispatcher verbatim and
//! in log order. Replay never writes to the execution log, and a
//! failed command does not stop the commands after it.

use agri_storage::ExecutionLogEntry;
use serde::Serialize;

use crate::dispatcher::DeviceDispatcher;

/// Which log entries to replay.
#[derive(Debug, Clone, Default)]
pub struct ReplayFilter {
    pub task_id: Option<String>,
    pub trace_id: Option<String>,
    /// Maximum entries to replay; 0 means all.
    pub limit: usize,
}

impl ReplayFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, entry: &ExecutionLogEntry) -> bool {
        self.task_id.as_deref().map_or(true, |id| entry.task_id == id)
            && self.trace_id.as_deref().map_or(true, |id| entry.trace_id == id)
    }

    /// Matching entries in log order, truncated to `limit`.
    pub fn select<'a>(&self, entries: &'a [ExecutionLogEntry]) -> Vec<&'a ExecutionLogEntry> {
        let limit = if self.limit == 0 { usize::MAX } else { self.limit };
        entries.iter().filter(|e| self.matches(e)).take(limit).collect()
    }
}

/// Counts of replayed and failed commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub replayed: usize,
    pub failed: usize,
}

/// Resubmit the entries selected by `filter`, one at a time.
pub async fn replay(
    entries: &[ExecutionLogEntry],
    filter: &ReplayFilter,
    dispatcher: &dyn DeviceDispatcher,
) -> ReplayReport {
    let mut report = ReplayReport::default();

    for entry in filter.select(entries) {
        let command = entry.to_command();
        match dispatcher.execute(&command).await {
            Ok(()) => report.replayed += 1,
            Err(e) => {
                tracing::warn!(
                    task_id = %command.task_id,
                    trace_id = %command.trace_id,
                    command = %command.command,
                    error = %e,
                    "Replayed command failed"
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        replayed = report.replayed,
        failed = report.failed,
        "Replay finished"
    );
    report
}
