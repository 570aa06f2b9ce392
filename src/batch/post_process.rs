//! Artifact filename post-processing.
//!
//! After a successful download the artifact's filename stem is passed
//! through the injected text converter, sanitized, and renamed with
//! collision handling. Every failure path here is non-fatal: the job stays
//! Completed and keeps whatever name the rename got to.

use std::path::{Path, PathBuf};

use super::BatchDownloader;
use crate::utils::{get_unique_path, sanitize_filename};

impl BatchDownloader {
    /// Convert and rename an artifact's filename, returning the final path.
    ///
    /// Returns the input path unchanged when conversion is disabled or
    /// unavailable, when the converter produces nothing new, or when any
    /// filesystem step fails.
    pub(crate) async fn finalize_artifact(&self, path: &Path) -> PathBuf {
        if !self.config.conversion.enabled || !self.converter.is_available() {
            return path.to_path_buf();
        }

        // Executors may report paths that never hit the local disk (tests,
        // dry runs); nothing to rename then.
        if !path.exists() {
            return path.to_path_buf();
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return path.to_path_buf();
        };
        let extension = path.extension().and_then(|e| e.to_str());

        let Some(converted) = self.converter.convert(stem) else {
            return path.to_path_buf();
        };
        if converted == stem {
            return path.to_path_buf();
        }

        let new_name = match extension {
            Some(ext) => sanitize_filename(&format!("{converted}.{ext}")),
            None => sanitize_filename(&converted),
        };
        if new_name.is_empty() {
            return path.to_path_buf();
        }

        let target = match path.parent() {
            Some(parent) => parent.join(&new_name),
            None => return path.to_path_buf(),
        };

        let Some(unique) = get_unique_path(&target, self.config.download.file_collision) else {
            tracing::warn!(
                target = %target.display(),
                "skipping filename conversion: target exists"
            );
            return path.to_path_buf();
        };

        match tokio::fs::rename(path, &unique).await {
            Ok(()) => {
                tracing::info!(
                    from = %path.display(),
                    to = %unique.display(),
                    "artifact filename converted"
                );
                unique
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "filename conversion rename failed (non-fatal)"
                );
                path.to_path_buf()
            }
        }
    }
}
