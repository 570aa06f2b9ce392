//! Engine lifecycle control — stop, clear, shutdown.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::BatchDownloader;
use crate::types::Event;

/// How long shutdown() waits for the worker to settle its current job
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl BatchDownloader {
    /// Request the worker to halt after the current job settles.
    ///
    /// Clears the running flag and fires the in-flight job's cancellation
    /// token; the executor is expected to observe the token and return a
    /// cancelled result promptly. Does not block waiting for the worker;
    /// the worker emits its final `BatchComplete` on its own way out.
    ///
    /// Untouched backlog entries stay Pending; a later
    /// [`start`](Self::start) resumes them. Use [`clear`](Self::clear) to
    /// discard the batch instead.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let state = self.state.lock().await;
        if let Some(token) = &state.active_cancel {
            tracing::info!(job_id = ?state.current.map(|id| id.get()), "cancelling in-flight job");
            token.cancel();
        }

        tracing::info!("batch download stop requested");
    }

    /// Stop the engine and discard the whole batch.
    ///
    /// Implies [`stop`](Self::stop), then wipes the backlog and every job
    /// record. Safe to call at any time, including while the worker is
    /// still winding down; the worker tolerates its job record vanishing.
    /// Idempotent.
    pub async fn clear(&self) {
        self.stop().await;

        {
            let mut state = self.state.lock().await;
            state.jobs.clear();
            state.backlog.clear();
            state.current = None;
            state.active_cancel = None;
        }

        tracing::info!("batch cleared");
        self.emit_event(Event::Cleared);
    }

    /// Gracefully shut down the engine.
    ///
    /// Performs the shutdown sequence:
    /// 1. Requests a stop and cancels the in-flight job
    /// 2. Waits for the worker to exit, with a 30 second timeout
    /// 3. Emits [`Event::Shutdown`]
    ///
    /// The timeout guards against an executor that ignores its cancellation
    /// token; in that case the worker task is left to finish detached.
    pub async fn shutdown(&self) {
        tracing::info!("initiating graceful shutdown");
        self.stop().await;

        let worker = {
            let mut state = self.state.lock().await;
            state.worker.take()
        };

        if let Some(mut handle) = worker {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => tracing::info!("worker exited cleanly"),
                Ok(Err(e)) => tracing::warn!(error = %e, "worker task ended abnormally"),
                Err(_) => {
                    tracing::warn!("timeout waiting for worker to exit, proceeding with shutdown");
                    // Keep the handle registered so start() still refuses to
                    // spawn a second worker next to the stuck one
                    self.state.lock().await.worker = Some(handle);
                }
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("graceful shutdown complete");
    }
}
