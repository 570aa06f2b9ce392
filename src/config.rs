//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, time::Duration};

/// Download behavior configuration (output location, timeouts, collisions)
///
/// Groups settings related to how artifacts are fetched and stored.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Default output directory (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Socket timeout passed through to the executor (default: 300 seconds)
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    pub socket_timeout: Duration,

    /// File collision handling for post-processed artifact names
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            socket_timeout: default_socket_timeout(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// Retry configuration for failed jobs
///
/// Failed jobs are re-enqueued at the back of the backlog until the cap is
/// reached, so a stubbornly failing job never starves fresh jobs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries per job (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

/// Disk space checking configuration
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DiskSpaceConfig {
    /// Enable the pre-job disk space check (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum free space required to start a job (default: 1 GB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space: u64,
}

impl Default for DiskSpaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_free_space: default_min_free_space(),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the rename, keep existing
    Skip,
}

/// Audio extraction preset (codec + target quality)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPreset {
    /// Target codec (e.g., "mp3", "m4a", "opus")
    pub codec: String,

    /// Target quality — bitrate in kbps, or "0" for the source quality
    pub quality: String,
}

/// Format preset tables mapping opaque selectors to extractor expressions.
///
/// Video presets map to format-selection expressions; audio presets map to
/// codec/quality pairs the executor turns into a transcode step. Unknown
/// selectors fall back to the configured defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Video format presets
    #[serde(default = "default_video_presets")]
    pub video_presets: HashMap<String, String>,

    /// Audio extraction presets
    #[serde(default = "default_audio_presets")]
    pub audio_presets: HashMap<String, AudioPreset>,

    /// Fallback video preset key (default: "best")
    #[serde(default = "default_video_key")]
    pub default_video: String,

    /// Fallback audio preset key (default: "mp3-192")
    #[serde(default = "default_audio_key")]
    pub default_audio: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            video_presets: default_video_presets(),
            audio_presets: default_audio_presets(),
            default_video: default_video_key(),
            default_audio: default_audio_key(),
        }
    }
}

impl FormatConfig {
    /// Resolve a video format selector to an expression, falling back to the
    /// default preset for unknown selectors
    pub fn resolve_video(&self, selector: &str) -> Option<&str> {
        self.video_presets
            .get(selector)
            .or_else(|| self.video_presets.get(&self.default_video))
            .map(String::as_str)
    }

    /// Resolve an audio format selector to a preset, falling back to the
    /// default preset for unknown selectors
    pub fn resolve_audio(&self, selector: &str) -> Option<&AudioPreset> {
        self.audio_presets
            .get(selector)
            .or_else(|| self.audio_presets.get(&self.default_audio))
    }
}

/// External tool paths
///
/// Groups settings for external binaries. Used as a nested sub-config
/// within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Filename script-conversion configuration
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Convert artifact filenames through the injected text converter (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Main configuration for [`BatchDownloader`](crate::BatchDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — output location, timeouts, collisions
/// - [`retry`](RetryConfig) — per-job retry cap
/// - [`disk_space`](DiskSpaceConfig) — pre-job free space check
/// - [`formats`](FormatConfig) — preset selector tables
/// - [`tools`](ToolsConfig) — external binary paths
/// - [`conversion`](ConversionConfig) — filename script conversion
///
/// The download and tools sub-configs are flattened for a flat
/// JSON/TOML serialization format.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Retry cap for failed jobs
    #[serde(default)]
    pub retry: RetryConfig,

    /// Disk space checking
    #[serde(default)]
    pub disk_space: DiskSpaceConfig,

    /// Format preset tables
    #[serde(default)]
    pub formats: FormatConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Filename script conversion
    #[serde(default)]
    pub conversion: ConversionConfig,
}

impl Config {
    /// Default output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Validate the configuration, returning the first problem found.
    ///
    /// Called by [`BatchDownloader::new`](crate::BatchDownloader::new); this
    /// is the only point where configuration errors surface to callers.
    pub fn validate(&self) -> Result<()> {
        if self.download.output_dir.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "output_dir must not be empty".into(),
                key: Some("output_dir".into()),
            });
        }

        if self.download.socket_timeout.is_zero() {
            return Err(Error::Config {
                message: "socket_timeout must be greater than zero".into(),
                key: Some("socket_timeout".into()),
            });
        }

        if !self.formats.video_presets.contains_key(&self.formats.default_video) {
            return Err(Error::Config {
                message: format!(
                    "default video preset '{}' is not in video_presets",
                    self.formats.default_video
                ),
                key: Some("formats.default_video".into()),
            });
        }

        if !self.formats.audio_presets.contains_key(&self.formats.default_audio) {
            return Err(Error::Config {
                message: format!(
                    "default audio preset '{}' is not in audio_presets",
                    self.formats.default_audio
                ),
                key: Some("formats.default_audio".into()),
            });
        }

        Ok(())
    }
}

// Default value functions

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_retries() -> u32 {
    3
}

fn default_min_free_space() -> u64 {
    1024 * 1024 * 1024 // 1 GB
}

fn default_true() -> bool {
    true
}

fn default_video_key() -> String {
    "best".to_string()
}

fn default_audio_key() -> String {
    "mp3-192".to_string()
}

fn default_video_presets() -> HashMap<String, String> {
    HashMap::from([
        ("best".into(), "bestvideo+bestaudio/best".into()),
        (
            "1080p".into(),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]".into(),
        ),
        (
            "720p".into(),
            "bestvideo[height<=720]+bestaudio/best[height<=720]".into(),
        ),
        (
            "480p".into(),
            "bestvideo[height<=480]+bestaudio/best[height<=480]".into(),
        ),
    ])
}

fn default_audio_presets() -> HashMap<String, AudioPreset> {
    HashMap::from([
        (
            "mp3-192".into(),
            AudioPreset {
                codec: "mp3".into(),
                quality: "192".into(),
            },
        ),
        (
            "mp3-320".into(),
            AudioPreset {
                codec: "mp3".into(),
                quality: "320".into(),
            },
        ),
        (
            "m4a".into(),
            AudioPreset {
                codec: "m4a".into(),
                quality: "0".into(),
            },
        ),
        (
            "opus".into(),
            AudioPreset {
                codec: "opus".into(),
                quality: "0".into(),
            },
        ),
    ])
}

/// Serialize/deserialize Duration as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
