//! Job intake and backlog management.

use std::path::Path;

use super::BatchDownloader;
use crate::types::{Event, Job, JobId, JobKind, JobSpec};
use crate::utils::validate_url;

impl BatchDownloader {
    /// Add a batch of jobs, returning the number actually accepted.
    ///
    /// Entries with empty or malformed URLs are skipped silently; a bad
    /// line in a pasted URL list must not fail the whole batch. Accepted
    /// jobs are appended to the backlog in input order and an
    /// [`Event::Queued`] is emitted for each.
    ///
    /// Jobs may be added while the worker is running; they join the end of
    /// the backlog.
    pub async fn add_jobs(&self, specs: &[JobSpec], output_dir: impl AsRef<Path>) -> usize {
        let output_dir = output_dir.as_ref();
        let mut queued = Vec::new();

        {
            let mut state = self.state.lock().await;
            for spec in specs {
                if !validate_url(&spec.url) {
                    tracing::debug!(url = %spec.url, "skipping invalid URL");
                    continue;
                }

                let id = JobId::new(state.jobs.len());
                let mut spec = spec.clone();
                spec.url = spec.url.trim().to_string();

                let job = Job::new(id, spec, output_dir.to_path_buf());
                queued.push((id, job.url.clone()));
                state.jobs.push(job);
                state.backlog.push_back(id);
            }
        }

        for (id, url) in &queued {
            self.emit_event(Event::Queued {
                id: *id,
                url: url.clone(),
            });
        }

        let added = queued.len();
        tracing::info!(
            added,
            skipped = specs.len() - added,
            "jobs added to batch"
        );
        added
    }

    /// Add jobs from a comma- or newline-separated URL list.
    ///
    /// Convenience wrapper for UI text fields: every entry shares the same
    /// kind and format selector. Blank entries are dropped, invalid URLs
    /// are skipped silently, and the number of accepted jobs is returned.
    pub async fn add_urls_from_text(
        &self,
        text: &str,
        kind: JobKind,
        format: &str,
        output_dir: impl AsRef<Path>,
    ) -> usize {
        let specs: Vec<JobSpec> = text
            .split([',', '\n'])
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|url| JobSpec::new(url, kind, format))
            .collect();

        self.add_jobs(&specs, output_dir).await
    }
}
