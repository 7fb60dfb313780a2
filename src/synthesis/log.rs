//! Run Log
//!
//! Append-only event sink shared by every job of a run. Jobs never read it
//! back; the default adapter forwards each event to `tracing`.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::job::JobStatus;
use crate::types::ErrorCategory;
use crate::validation::Stage;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    JobStarted {
        test: String,
    },
    /// Prompt estimate above the ceiling; no provider call was made
    PromptSkipped {
        test: String,
        round: u32,
        tokens: usize,
        ceiling: usize,
    },
    Generated {
        test: String,
        round: u32,
    },
    /// Reply contained no code block
    ExtractionFailed {
        test: String,
        round: u32,
    },
    Validated {
        test: String,
        round: u32,
        failed_stage: Option<Stage>,
    },
    JobFinished {
        test: String,
        status: JobStatus,
        rounds: u32,
    },
    JobError {
        test: String,
        error: String,
        /// Set for classified provider failures
        category: Option<ErrorCategory>,
    },
    /// A class or method that never became a job
    Skipped {
        target: String,
        reason: String,
    },
    Cancelled {
        pending: usize,
    },
}

pub trait RunLog: Send + Sync {
    fn record(&self, event: RunEvent);
}

pub type SharedRunLog = Arc<dyn RunLog>;

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLog;

impl RunLog for TracingRunLog {
    fn record(&self, event: RunEvent) {
        match event {
            RunEvent::JobStarted { test } => info!(test = %test, "Generating test"),
            RunEvent::PromptSkipped {
                test,
                round,
                tokens,
                ceiling,
            } => warn!(
                test = %test,
                round,
                "Exceed max prompt tokens ({} > {}), skipped",
                tokens,
                ceiling
            ),
            RunEvent::Generated { test, round } => debug!(test = %test, round, "Candidate generated"),
            RunEvent::ExtractionFailed { test, round } => {
                warn!(test = %test, round, "No code block in reply")
            }
            RunEvent::Validated {
                test,
                round,
                failed_stage,
            } => match failed_stage {
                None => info!(test = %test, round, "Validation passed"),
                Some(stage) => info!(test = %test, round, %stage, "Validation failed"),
            },
            RunEvent::JobFinished {
                test,
                status,
                rounds,
            } => info!(test = %test, %status, rounds, "Job finished"),
            RunEvent::JobError {
                test,
                error,
                category: Some(category),
            } => warn!(test = %test, %category, "Job failed: {}", error),
            RunEvent::JobError { test, error, .. } => warn!(test = %test, "Job failed: {}", error),
            RunEvent::Skipped { target, reason } => warn!(target = %target, "Skipped: {}", reason),
            RunEvent::Cancelled { pending } => warn!(pending, "Run cancelled"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryRunLog;
    use super::*;

    #[test]
    fn test_memory_log_is_append_only() {
        let log = MemoryRunLog::default();
        log.record(RunEvent::JobStarted {
            test: "com.x.Calc_add_Test".to_string(),
        });
        log.record(RunEvent::Generated {
            test: "com.x.Calc_add_Test".to_string(),
            round: 0,
        });

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RunEvent::JobStarted { .. }));
    }

    #[test]
    fn test_tracing_log_accepts_every_event() {
        let log = TracingRunLog;
        log.record(RunEvent::Cancelled { pending: 2 });
        log.record(RunEvent::Validated {
            test: "T".to_string(),
            round: 1,
            failed_stage: Some(Stage::Compile),
        });
        log.record(RunEvent::JobError {
            test: "T".to_string(),
            error: "429".to_string(),
            category: Some(ErrorCategory::RateLimit),
        });
    }
}
