//! Shared test helpers for creating BatchDownloader instances in tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::batch::BatchDownloader;
use crate::config::Config;
use crate::error::Error;
use crate::executor::{Artifact, Executor, JobRequest};
use crate::types::{Event, JobKind, Progress};

/// Scripted behavior for one URL in a [`MockExecutor`]
#[derive(Clone, Debug)]
pub(crate) enum MockBehavior {
    /// Create the artifact file and succeed
    Succeed,
    /// Fail the first `n` attempts, then succeed
    FailTimes(u32),
    /// Fail every attempt
    AlwaysFail,
    /// Panic inside the executor (worker must contain it)
    Panic,
    /// Wait for the cancellation token, then return a cancelled result
    BlockUntilCancelled,
    /// Send the given progress updates, then succeed
    EmitProgress(Vec<Progress>),
}

/// Executor test double with per-URL scripted behaviors.
///
/// URLs without an explicit behavior succeed. Every call notifies
/// `started` so tests can synchronize with the worker without sleeping.
pub(crate) struct MockExecutor {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    attempts: Mutex<HashMap<String, u32>>,
    total_calls: AtomicU32,
    /// Notified at the start of every execute() call
    pub(crate) started: tokio::sync::Notify,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            total_calls: AtomicU32::new(0),
            started: tokio::sync::Notify::new(),
        }
    }

    /// Script a behavior for a specific URL
    pub(crate) fn set_behavior(&self, url: &str, behavior: MockBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(url.to_string(), behavior);
    }

    /// Number of execute() calls made for a URL
    pub(crate) fn attempts(&self, url: &str) -> u32 {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Number of execute() calls made in total
    pub(crate) fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn artifact_path(request: &JobRequest) -> PathBuf {
        let stem = request
            .url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("media")
            .replace(['?', '=', '&'], "_");
        let ext = match request.kind {
            JobKind::Video => "mp4",
            JobKind::Audio => "mp3",
        };
        request.output_dir.join(format!("{stem}.{ext}"))
    }

    async fn succeed(request: &JobRequest) -> crate::Result<Artifact> {
        let path = Self::artifact_path(request);
        tokio::fs::write(&path, b"test artifact").await?;
        Ok(Artifact::new(path))
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(
        &self,
        request: &JobRequest,
        progress: mpsc::UnboundedSender<Progress>,
        cancel: &CancellationToken,
    ) -> crate::Result<Artifact> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(request.url.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.started.notify_one();

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or(MockBehavior::Succeed);

        match behavior {
            MockBehavior::Succeed => Self::succeed(request).await,
            MockBehavior::FailTimes(n) => {
                if attempt <= n {
                    Err(Error::Execute(format!("simulated failure (attempt {attempt})")))
                } else {
                    Self::succeed(request).await
                }
            }
            MockBehavior::AlwaysFail => {
                Err(Error::Execute(format!("simulated failure (attempt {attempt})")))
            }
            MockBehavior::Panic => panic!("simulated executor panic"),
            MockBehavior::BlockUntilCancelled => {
                cancel.cancelled().await;
                Err(Error::Cancelled)
            }
            MockBehavior::EmitProgress(updates) => {
                for update in updates {
                    progress.send(update).ok();
                }
                Self::succeed(request).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Create a test BatchDownloader backed by a MockExecutor.
/// Returns the engine, the executor, and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader()
-> (BatchDownloader, Arc<MockExecutor>, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("downloads");
    // Keep unit tests independent of the host's free disk space
    config.disk_space.enabled = false;

    let executor = Arc::new(MockExecutor::new());
    let downloader = BatchDownloader::new(config, executor.clone() as Arc<dyn Executor>)
        .await
        .unwrap();

    (downloader, executor, temp_dir)
}

/// Receive events until (and including) BatchComplete, with a timeout on
/// every step so a wedged worker fails the test instead of hanging it.
pub(crate) async fn drain_until_batch_complete(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for batch completion")
            .expect("event channel closed");

        let done = matches!(event, Event::BatchComplete { .. });
        events.push(event);
        if done {
            return events;
        }
    }
}

/// The output directory used by a test downloader
pub(crate) fn output_dir(temp_dir: &tempfile::TempDir) -> PathBuf {
    temp_dir.path().join("downloads")
}
