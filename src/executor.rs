//! Executor contract — the seam to the external media-extraction engine
//!
//! The engine never performs network I/O itself; it delegates each job to an
//! [`Executor`] implementation. Implementations stream [`Progress`] updates
//! through a channel, support cooperative cancellation through a
//! [`CancellationToken`], and return either the final [`Artifact`] or an
//! error. A cancelled transfer must surface as [`Error::Cancelled`], a
//! distinguished result rather than unwind-based control flow.
//!
//! [`Error::Cancelled`]: crate::Error::Cancelled

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::types::{Job, JobKind, Progress};

/// Resolved format selection handed to the executor.
///
/// Opaque preset selectors on the job record are resolved against the
/// configured preset tables before the executor sees them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FormatSelection {
    /// Video download with a format-selection expression
    Video {
        /// Extractor format expression (e.g., "bestvideo+bestaudio/best")
        expression: String,
    },
    /// Audio-only extraction with a transcode target
    Audio {
        /// Target codec (e.g., "mp3")
        codec: String,
        /// Target quality — bitrate in kbps, or "0" for source quality
        quality: String,
    },
}

/// Everything an executor needs to perform one job
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// Source URL
    pub url: String,

    /// Requested media kind
    pub kind: JobKind,

    /// Resolved format selection
    pub format: FormatSelection,

    /// Directory the artifact must be written to
    pub output_dir: PathBuf,

    /// Socket timeout the executor should apply to network operations
    pub socket_timeout: Duration,
}

impl JobRequest {
    /// Build a request for a job, resolving its format selector against the
    /// configured preset tables. Unknown selectors fall back to the default
    /// preset, and a missing default falls back to a built-in.
    pub fn resolve(job: &Job, config: &Config) -> Self {
        let format = match job.kind {
            JobKind::Video => FormatSelection::Video {
                expression: config
                    .formats
                    .resolve_video(&job.format)
                    .unwrap_or("bestvideo+bestaudio/best")
                    .to_string(),
            },
            JobKind::Audio => {
                let preset = config.formats.resolve_audio(&job.format);
                FormatSelection::Audio {
                    codec: preset.map(|p| p.codec.clone()).unwrap_or_else(|| "mp3".into()),
                    quality: preset.map(|p| p.quality.clone()).unwrap_or_else(|| "192".into()),
                }
            }
        };

        Self {
            url: job.url.clone(),
            kind: job.kind,
            format,
            output_dir: job.output_dir.clone(),
            socket_timeout: config.download.socket_timeout,
        }
    }
}

/// Final output of a successfully executed job
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Path of the downloaded (and possibly transcoded) file
    pub path: PathBuf,

    /// Extractor-provided metadata, if any (title, duration, uploader, ...)
    pub metadata: Option<serde_json::Value>,
}

impl Artifact {
    /// Create an artifact with no metadata
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: None,
        }
    }
}

/// Trait for single-job execution
///
/// Implementations wrap an actual extraction/download engine. The contract:
///
/// - send zero or more [`Progress`] updates through `progress` while the
///   transfer runs (the channel is unbounded and the engine drains it
///   concurrently, so sending never blocks);
/// - check `cancel` at reasonable points and return
///   [`Error::Cancelled`](crate::Error::Cancelled) promptly once it fires;
///   never silently succeed or vanish after cancellation;
/// - return `Ok(Artifact)` exactly once on success, or `Err` with a
///   human-readable message on failure.
///
/// # Examples
///
/// ```no_run
/// use media_dl::{BatchDownloader, Config, NoOpExecutor};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = BatchDownloader::new(Config::default(), Arc::new(NoOpExecutor)).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one job to completion, cancellation, or failure
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) if the token
    /// fired mid-transfer, or any other error for a failed transfer. The
    /// engine converts either into a status transition; nothing propagates
    /// past the queue boundary.
    async fn execute(
        &self,
        request: &JobRequest,
        progress: mpsc::UnboundedSender<Progress>,
        cancel: &CancellationToken,
    ) -> crate::Result<Artifact>;

    /// Human-readable name for logging and capability reporting
    fn name(&self) -> &'static str;
}

/// No-op executor used when no extraction engine is wired up
///
/// Fails every job with `Error::NotSupported`. Useful for wiring tests and
/// for embedding contexts that only exercise queue bookkeeping.
pub struct NoOpExecutor;

#[async_trait]
impl Executor for NoOpExecutor {
    async fn execute(
        &self,
        _request: &JobRequest,
        _progress: mpsc::UnboundedSender<Progress>,
        _cancel: &CancellationToken,
    ) -> crate::Result<Artifact> {
        Err(crate::Error::NotSupported(
            "no extraction engine configured. \
             Provide an Executor implementation to BatchDownloader::new."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
