//! Worker loop — drains the backlog one job at a time.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::BatchDownloader;
use crate::error::Error;
use crate::executor::JobRequest;
use crate::retry::Disposition;
use crate::types::{BatchSummary, Event, JobId, Progress, Status};
use crate::utils::get_available_space;

impl BatchDownloader {
    /// Begin processing the backlog.
    ///
    /// Spawns exactly one worker task. Returns `false` without side effects
    /// when the engine is already running, when a previous worker has not
    /// finished winding down, or when the backlog is empty. Repeated calls
    /// while running are no-ops.
    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;

        if self.running.load(Ordering::SeqCst) {
            tracing::debug!("start ignored: already running");
            return false;
        }
        // A stop() may have cleared the flag while the previous worker is
        // still settling its current job; never run two workers at once.
        if let Some(handle) = &state.worker
            && !handle.is_finished()
        {
            tracing::debug!("start ignored: previous worker still draining");
            return false;
        }
        if state.backlog.is_empty() {
            tracing::debug!("start ignored: backlog empty");
            return false;
        }

        self.running.store(true, Ordering::SeqCst);
        let engine = self.clone();
        state.worker = Some(tokio::spawn(async move {
            engine.worker_loop().await;
        }));

        tracing::info!(pending = state.backlog.len(), "batch download started");
        true
    }

    /// Main worker loop.
    ///
    /// Pops the next pending job, delegates to the executor, applies the
    /// retry policy, and repeats until the backlog drains or a stop request
    /// is observed. Emits exactly one `BatchComplete` on the way out.
    async fn worker_loop(self) {
        while self.running.load(Ordering::SeqCst) {
            let next = {
                let mut state = self.state.lock().await;
                match state.backlog.pop_front() {
                    Some(id) => {
                        let cancel = CancellationToken::new();
                        state.current = Some(id);
                        state.active_cancel = Some(cancel.clone());

                        let config = Arc::clone(&self.config);
                        state.jobs.get_mut(id.get()).map(|job| {
                            job.status = Status::Downloading;
                            if job.started_at.is_none() {
                                job.started_at = Some(Utc::now());
                            }
                            (id, JobRequest::resolve(job, &config), cancel)
                        })
                    }
                    None => None,
                }
            };

            let Some((id, request, cancel)) = next else {
                break;
            };

            self.process_job(id, request, cancel).await;
        }

        self.running.store(false, Ordering::SeqCst);

        let summary = {
            let mut state = self.state.lock().await;
            state.current = None;
            state.active_cancel = None;
            BatchSummary::compute(&state.jobs, None)
        };

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            pending = summary.pending,
            "batch download finished"
        );
        self.emit_event(Event::BatchComplete { summary });
    }

    /// Execute one job and apply the transition rules for its outcome.
    ///
    /// The queue lock is never held while the executor runs. Executor
    /// panics are contained here and treated like any other failure.
    async fn process_job(&self, id: JobId, request: JobRequest, cancel: CancellationToken) {
        tracing::info!(job_id = id.get(), url = %request.url, "job started");

        let outcome = match self.check_disk_space(&request) {
            Err(e) => Err(e),
            Ok(()) => {
                let (progress_tx, progress_rx) = mpsc::unbounded_channel();
                let relay = tokio::spawn(relay_progress(self.clone(), id, progress_rx));

                let executor = Arc::clone(&self.executor);
                let exec_cancel = cancel.clone();
                let execution = tokio::spawn(async move {
                    executor.execute(&request, progress_tx, &exec_cancel).await
                });

                let outcome = match execution.await {
                    Ok(result) => result,
                    // A panicking executor must not take the batch down
                    Err(join_error) => {
                        Err(Error::Other(format!("executor task failed: {join_error}")))
                    }
                };

                // Drain remaining progress before the terminal event so
                // per-job event ordering holds for subscribers.
                let _ = relay.await;
                outcome
            }
        };

        match outcome {
            Ok(artifact) => self.finalize_success(id, artifact).await,
            Err(error) => self.finalize_failure(id, error).await,
        }
    }

    /// Mark a job Completed and emit its terminal event
    async fn finalize_success(&self, id: JobId, artifact: crate::executor::Artifact) {
        let final_path = self.finalize_artifact(&artifact.path).await;

        let event = {
            let mut state = self.state.lock().await;
            state.current = None;
            state.active_cancel = None;

            let snapshot = match state.jobs.get_mut(id.get()) {
                Some(job) => {
                    job.status = Status::Completed;
                    job.artifact = Some(final_path.clone());
                    job.completed_at = Some(Utc::now());
                    Some(job.clone())
                }
                None => None,
            };

            snapshot.map(|job| {
                let summary = BatchSummary::compute(&state.jobs, None);
                Event::JobComplete { job, summary }
            })
        };

        match event {
            Some(event) => {
                tracing::info!(job_id = id.get(), path = %final_path.display(), "job completed");
                self.emit_event(event);
            }
            // The batch was cleared while the job was in flight
            None => tracing::debug!(job_id = id.get(), "job record gone, dropping result"),
        }
    }

    /// Apply the retry policy to a failed or cancelled job
    async fn finalize_failure(&self, id: JobId, error: Error) {
        let event = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            state.current = None;
            state.active_cancel = None;

            let engine_running = self.running.load(Ordering::SeqCst);
            let Some(job) = state.jobs.get_mut(id.get()) else {
                tracing::debug!(job_id = id.get(), "job record gone, dropping failure");
                return;
            };

            match self.retry_policy.assess(&error, job.retry_count, engine_running) {
                Disposition::Retry => {
                    job.retry_count += 1;
                    job.status = Status::Pending;
                    job.error = Some(error.to_string());
                    let retry_count = job.retry_count;
                    state.backlog.push_back(id);

                    tracing::warn!(
                        job_id = id.get(),
                        retry_count,
                        max_retries = self.retry_policy.max_retries(),
                        error = %error,
                        "job failed, re-enqueued for retry"
                    );
                    Event::Retrying {
                        id,
                        retry_count,
                        max_retries: self.retry_policy.max_retries(),
                    }
                }
                Disposition::Fail => {
                    job.status = Status::Failed;
                    job.error = Some(error.to_string());
                    job.completed_at = Some(Utc::now());
                    let job = job.clone();

                    tracing::error!(job_id = id.get(), error = %error, "job failed terminally");
                    let summary = BatchSummary::compute(&state.jobs, None);
                    Event::JobComplete { job, summary }
                }
                Disposition::Cancel => {
                    job.status = Status::Cancelled;
                    job.error = Some(error.to_string());
                    job.completed_at = Some(Utc::now());
                    let job = job.clone();

                    tracing::info!(job_id = id.get(), "job cancelled");
                    let summary = BatchSummary::compute(&state.jobs, None);
                    Event::JobComplete { job, summary }
                }
            }
        };

        self.emit_event(event);
    }

    /// Pre-job free space check.
    ///
    /// A failed *check* (e.g., exotic filesystem) is logged and waved
    /// through; only a confirmed shortage fails the job.
    fn check_disk_space(&self, request: &JobRequest) -> crate::Result<()> {
        if !self.config.disk_space.enabled {
            return Ok(());
        }

        match get_available_space(&request.output_dir) {
            Ok(available) => {
                if available < self.config.disk_space.min_free_space {
                    return Err(Error::InsufficientSpace {
                        required: self.config.disk_space.min_free_space,
                        available,
                    });
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    path = %request.output_dir.display(),
                    error = %e,
                    "could not check disk space, assuming sufficient"
                );
                Ok(())
            }
        }
    }
}

/// Forward executor progress to subscribers, enriched with the originating
/// job id and a freshly computed batch summary.
async fn relay_progress(
    engine: BatchDownloader,
    id: JobId,
    mut rx: mpsc::UnboundedReceiver<Progress>,
) {
    while let Some(progress) = rx.recv().await {
        let summary = engine.summary().await;
        engine.emit_event(Event::Progress {
            id,
            progress,
            summary,
        });
    }
}
