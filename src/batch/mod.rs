//! Core batch engine split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Job intake and backlog management
//! - [`worker`] - Worker loop and per-job execution
//! - [`control`] - Engine lifecycle control (stop/clear/shutdown)
//! - [`post_process`] - Artifact filename post-processing

mod control;
mod post_process;
mod queue;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::convert::{NoOpConverter, TextConverter};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::retry::RetryPolicy;
use crate::types::{BatchSummary, Event, Job, JobId};

/// Broadcast channel capacity for the event stream
const EVENT_BUFFER_SIZE: usize = 1000;

/// Mutable queue state — the single mutually-exclusive region.
///
/// Held only for list/flag mutation, never across an executor invocation.
pub(crate) struct BatchState {
    /// All job records of the batch, indexed by [`JobId`] (the arena)
    pub(crate) jobs: Vec<Job>,
    /// FIFO backlog of Pending job ids; each id appears at most once
    pub(crate) backlog: VecDeque<JobId>,
    /// The job currently being executed, if any
    pub(crate) current: Option<JobId>,
    /// Cancellation token of the in-flight job
    pub(crate) active_cancel: Option<tokio_util::sync::CancellationToken>,
    /// Handle of the worker task, kept so start() can refuse to double-spawn
    pub(crate) worker: Option<tokio::task::JoinHandle<()>>,
}

impl BatchState {
    fn new() -> Self {
        Self {
            jobs: Vec::new(),
            backlog: VecDeque::new(),
            current: None,
            active_cancel: None,
            worker: None,
        }
    }
}

/// Feature availability report for embedding UIs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the executor implementation in use
    pub executor: String,

    /// Whether ffmpeg was found (audio transcode presets need it)
    pub ffmpeg_available: bool,

    /// Whether filename script conversion is available
    pub conversion_available: bool,
}

/// Batch download engine (cloneable - all fields are Arc-wrapped)
///
/// Owns the ordered backlog of pending jobs, runs exactly one job at a time
/// on a dedicated worker task, re-enqueues failed jobs up to the configured
/// retry cap, and broadcasts progress/completion events to any number of
/// subscribers.
///
/// # Examples
///
/// ```no_run
/// use media_dl::{BatchDownloader, Config, JobKind, JobSpec, NoOpExecutor};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = BatchDownloader::new(Config::default(), Arc::new(NoOpExecutor)).await?;
///
/// // Subscribe to events
/// let mut events = downloader.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// let added = downloader
///     .add_jobs(
///         &[JobSpec::new("https://example.com/watch?v=1", JobKind::Audio, "mp3-192")],
///         "./downloads",
///     )
///     .await;
/// assert_eq!(added, 1);
///
/// downloader.start().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BatchDownloader {
    /// The single-mutex queue state region
    pub(crate) state: Arc<tokio::sync::Mutex<BatchState>>,
    /// Whether the worker loop should keep draining the backlog
    pub(crate) running: Arc<AtomicBool>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Single-job executor (trait object for pluggable engines)
    pub(crate) executor: Arc<dyn Executor>,
    /// Filename text converter (trait object, no-op by default)
    pub(crate) converter: Arc<dyn TextConverter>,
    /// Retry disposition policy derived from the config
    pub(crate) retry_policy: RetryPolicy,
}

impl BatchDownloader {
    /// Create a new BatchDownloader instance
    ///
    /// Validates the configuration, creates the default output directory,
    /// and sets up the event broadcast channel. The engine starts idle;
    /// populate it with [`add_jobs`](Self::add_jobs) and kick it off with
    /// [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid configuration or an I/O error
    /// if the output directory cannot be created. This is the only public
    /// operation that surfaces errors to callers.
    pub async fn new(config: Config, executor: Arc<dyn Executor>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.output_dir())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create output directory '{}': {}",
                        config.output_dir().display(),
                        e
                    ),
                ))
            })?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_BUFFER_SIZE);
        let retry_policy = RetryPolicy::new(config.retry.max_retries);

        tracing::info!(
            executor = executor.name(),
            max_retries = config.retry.max_retries,
            "batch downloader initialized"
        );

        Ok(Self {
            state: Arc::new(tokio::sync::Mutex::new(BatchState::new())),
            running: Arc::new(AtomicBool::new(false)),
            event_tx,
            config: Arc::new(config),
            executor,
            converter: Arc::new(NoOpConverter),
            retry_policy,
        })
    }

    /// Replace the filename text converter
    ///
    /// By default a no-op converter is installed and artifact filenames pass
    /// through untouched. Conversion failure at runtime is non-fatal.
    #[must_use]
    pub fn with_text_converter(mut self, converter: Arc<dyn TextConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Subscribe to batch events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all
    /// events independently. Events are buffered, but if a subscriber falls
    /// behind by more than 1000 events it will receive a
    /// `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Point-in-time aggregate of the batch
    ///
    /// Recomputed from the job records on every call, never cached.
    pub async fn summary(&self) -> BatchSummary {
        let state = self.state.lock().await;
        BatchSummary::compute(&state.jobs, state.current)
    }

    /// Snapshot of a single job record, if the id is known
    pub async fn job(&self, id: JobId) -> Option<Job> {
        let state = self.state.lock().await;
        state.jobs.get(id.get()).cloned()
    }

    /// Snapshot of every job record in the batch
    pub async fn jobs(&self) -> Vec<Job> {
        let state = self.state.lock().await;
        state.jobs.clone()
    }

    /// Whether the worker loop is currently draining the backlog
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Query the current system capabilities
    ///
    /// Reports which optional features are available based on configuration
    /// and installed external tools.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            executor: self.executor.name().to_string(),
            ffmpeg_available: crate::utils::find_ffmpeg(&self.config.tools).is_some(),
            conversion_available: self.converter.is_available(),
        }
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the batch keeps processing whether or not anyone is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
