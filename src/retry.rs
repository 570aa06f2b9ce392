//! Retry policy for failed jobs
//!
//! A failed job is re-enqueued at the back of the backlog until its retry
//! budget is exhausted, so other pending jobs are not starved behind a
//! stubbornly failing one. Cancellation is never retried, and a stopped
//! engine consumes no retry budget; the job fails terminally instead of
//! being re-queued into a backlog nothing will drain.

use crate::error::Error;

/// What to do with a job after a failed execution attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Re-enqueue at the back of the backlog with an incremented retry count
    Retry,
    /// Finalize as Failed, retaining the last error message
    Fail,
    /// Finalize as Cancelled after the job observed its cancellation token
    Cancel,
}

/// Decides retry/fail/cancel dispositions for failed executions
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    /// Create a policy with the given per-job retry cap
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// The configured per-job retry cap
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Assess a failed execution attempt.
    ///
    /// `retry_count` is the number of retries the job has already consumed;
    /// `engine_running` is the engine's running flag at assessment time.
    pub fn assess(&self, error: &Error, retry_count: u32, engine_running: bool) -> Disposition {
        if error.is_cancelled() {
            return Disposition::Cancel;
        }

        if retry_count < self.max_retries && engine_running {
            Disposition::Retry
        } else {
            Disposition::Fail
        }
    }
}
