//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a job within a batch.
///
/// Jobs live in an indexed arena owned by the engine; the backlog and all
/// events reference them by this stable index, never by object identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub usize);

impl JobId {
    /// Create a new JobId
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the inner index value
    pub fn get(&self) -> usize {
        self.0
    }
}

impl From<usize> for JobId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

impl From<JobId> for usize {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of media to extract for a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Full video download (merged with best audio)
    Video,
    /// Audio-only extraction
    Audio,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Video => write!(f, "video"),
            JobKind::Audio => write!(f, "audio"),
        }
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting in the backlog
    Pending,
    /// Currently being executed
    Downloading,
    /// Successfully completed
    Completed,
    /// Failed with retries exhausted
    Failed,
    /// Cancelled by the caller while in flight
    Cancelled,
}

impl Status {
    /// Whether this status is terminal (the job will never run again)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::Cancelled)
    }
}

/// Input describing a single job to enqueue
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSpec {
    /// Source URL
    pub url: String,

    /// Requested media kind
    pub kind: JobKind,

    /// Format preset selector (opaque key into the configured preset tables)
    pub format: String,
}

impl JobSpec {
    /// Create a new job spec
    pub fn new(url: impl Into<String>, kind: JobKind, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            format: format.into(),
        }
    }
}

/// One download request tracked by the engine.
///
/// Identity fields are set at enqueue time; the engine mutates only
/// `status`, `retry_count`, `error`, `artifact` and the timestamps while
/// running or finalizing the job. Records are snapshot-cloned into events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    /// Stable arena index
    pub id: JobId,

    /// Source URL
    pub url: String,

    /// Requested media kind
    pub kind: JobKind,

    /// Format preset selector
    pub format: String,

    /// Directory the artifact is written to
    pub output_dir: PathBuf,

    /// Current status
    pub status: Status,

    /// Number of retries consumed so far (never exceeds the configured maximum)
    pub retry_count: u32,

    /// Last error message (retained across retries)
    pub error: Option<String>,

    /// Final artifact path (set only on success)
    pub artifact: Option<PathBuf>,

    /// When the job was added to the batch
    pub created_at: DateTime<Utc>,

    /// When the job was first handed to the executor (None if never started)
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new Pending job record
    pub fn new(id: JobId, spec: JobSpec, output_dir: PathBuf) -> Self {
        Self {
            id,
            url: spec.url,
            kind: spec.kind,
            format: spec.format,
            output_dir,
            status: Status::Pending,
            retry_count: 0,
            error: None,
            artifact: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Progress snapshot reported by the executor during a transfer
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Bytes downloaded so far
    pub downloaded_bytes: u64,

    /// Total bytes, or best estimate (0 = unknown/indeterminate)
    pub total_bytes: u64,

    /// Current transfer speed in bytes per second
    pub speed_bps: u64,

    /// Estimated time remaining in seconds (None if unknown)
    pub eta_seconds: Option<u64>,
}

impl Progress {
    /// Progress percentage (0.0 to 100.0), or 0.0 when the total is unknown
    pub fn percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.downloaded_bytes as f64 / self.total_bytes as f64 * 100.0) as f32
    }
}

/// Point-in-time aggregate of a batch.
///
/// Always recomputed from the job records, never cached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total number of jobs in the batch
    pub total: usize,

    /// Number of completed jobs
    pub completed: usize,

    /// Number of jobs failed with retries exhausted
    pub failed: usize,

    /// Number of cancelled jobs
    pub cancelled: usize,

    /// Number of jobs waiting in the backlog
    pub pending: usize,

    /// Number of jobs currently downloading (0 or 1)
    pub downloading: usize,

    /// 1-based index of the job currently being processed (0 when idle)
    pub current_index: usize,
}

impl BatchSummary {
    /// Compute a summary from the full job list and the current job, if any
    pub fn compute(jobs: &[Job], current: Option<JobId>) -> Self {
        let mut summary = BatchSummary {
            total: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            match job.status {
                Status::Pending => summary.pending += 1,
                Status::Downloading => summary.downloading += 1,
                Status::Completed => summary.completed += 1,
                Status::Failed => summary.failed += 1,
                Status::Cancelled => summary.cancelled += 1,
            }
        }

        summary.current_index = current.map(|id| id.get() + 1).unwrap_or(0);
        summary
    }
}

/// Event emitted during the batch lifecycle.
///
/// Consumers receive these through [`BatchDownloader::subscribe`]; there is
/// no polling interface beyond [`BatchDownloader::summary`].
///
/// [`BatchDownloader::subscribe`]: crate::BatchDownloader::subscribe
/// [`BatchDownloader::summary`]: crate::BatchDownloader::summary
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted into the batch
    Queued {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
    },

    /// Progress update for the in-flight job, enriched with a batch summary
    Progress {
        /// Job ID of the originating job
        id: JobId,
        /// Executor-reported progress fields
        progress: Progress,
        /// Freshly computed batch summary
        summary: BatchSummary,
    },

    /// A failed job was re-enqueued at the back of the backlog
    Retrying {
        /// Job ID
        id: JobId,
        /// Retries consumed so far, including this one
        retry_count: u32,
        /// Configured retry cap
        max_retries: u32,
    },

    /// A job reached a terminal status (Completed, Failed, or Cancelled).
    ///
    /// Fired once per job; intermediate retry failures do not emit this.
    JobComplete {
        /// Snapshot of the finalized job record
        job: Job,
        /// Freshly computed batch summary
        summary: BatchSummary,
    },

    /// The worker loop exited. Always the last event of a run, exactly once
    /// per start-to-drain cycle.
    BatchComplete {
        /// Final batch summary
        summary: BatchSummary,
    },

    /// The batch was cleared; all records were discarded
    Cleared,

    /// Graceful shutdown initiated
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_status(id: usize, status: Status) -> Job {
        let mut job = Job::new(
            JobId(id),
            JobSpec::new("https://example.com/watch?v=1", JobKind::Video, "best"),
            PathBuf::from("/tmp/out"),
        );
        job.status = status;
        job
    }

    // --- Status ---

    #[test]
    fn terminal_statuses_are_exactly_completed_failed_cancelled() {
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::Downloading.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(Status::Cancelled.is_terminal());
    }

    // --- Progress ---

    #[test]
    fn percent_with_known_total() {
        let progress = Progress {
            downloaded_bytes: 42,
            total_bytes: 100,
            speed_bps: 1024,
            eta_seconds: Some(3),
        };
        assert!((progress.percent() - 42.0).abs() < f32::EPSILON);
    }

    #[test]
    fn percent_with_unknown_total_is_zero() {
        let progress = Progress {
            downloaded_bytes: 1_000_000,
            total_bytes: 0,
            ..Default::default()
        };
        assert_eq!(
            progress.percent(),
            0.0,
            "unknown total must be treated as indeterminate, not a division by zero"
        );
    }

    // --- BatchSummary ---

    #[test]
    fn compute_counts_every_status_bucket() {
        let jobs = vec![
            job_with_status(0, Status::Completed),
            job_with_status(1, Status::Completed),
            job_with_status(2, Status::Failed),
            job_with_status(3, Status::Cancelled),
            job_with_status(4, Status::Pending),
            job_with_status(5, Status::Downloading),
        ];

        let summary = BatchSummary::compute(&jobs, Some(JobId(5)));

        assert_eq!(summary.total, 6);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.downloading, 1);
        assert_eq!(summary.current_index, 6, "current_index is 1-based");
    }

    #[test]
    fn compute_on_empty_batch_is_all_zero() {
        let summary = BatchSummary::compute(&[], None);
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn current_index_is_zero_when_idle() {
        let jobs = vec![job_with_status(0, Status::Pending)];
        let summary = BatchSummary::compute(&jobs, None);
        assert_eq!(summary.current_index, 0);
    }

    // --- Job ---

    #[test]
    fn new_job_starts_pending_with_zero_retries() {
        let job = Job::new(
            JobId(3),
            JobSpec::new("https://example.com/a", JobKind::Audio, "mp3-192"),
            PathBuf::from("/downloads"),
        );

        assert_eq!(job.id, JobId(3));
        assert_eq!(job.status, Status::Pending);
        assert_eq!(job.retry_count, 0);
        assert!(job.error.is_none());
        assert!(job.artifact.is_none());
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }

    // --- Event serialization ---

    #[test]
    fn events_serialize_with_snake_case_type_tag() {
        let event = Event::BatchComplete {
            summary: BatchSummary::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_complete");

        let event = Event::Queued {
            id: JobId(7),
            url: "https://example.com".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "queued");
        assert_eq!(json["id"], 7);
    }
}
