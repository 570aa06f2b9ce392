//! Utility functions for validation, filenames, and system checks

use crate::config::{FileCollisionAction, ToolsConfig};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Maximum filename length in characters (before the extension is re-attached)
const MAX_FILENAME_CHARS: usize = 200;

/// Validate a download URL
///
/// Accepts http/https URLs with a host. Empty or whitespace-only strings
/// are invalid. Enqueue-time validation uses this to silently skip bad
/// entries rather than failing the batch.
///
/// # Examples
///
/// ```
/// use media_dl::utils::validate_url;
///
/// assert!(validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(!validate_url("not_a_url"));
/// assert!(!validate_url(""));
/// ```
#[must_use]
pub fn validate_url(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return false;
    }

    match url::Url::parse(trimmed) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Sanitize a filename for cross-platform use
///
/// Replaces the characters `< > : " / \ | ? *` with underscores, trims
/// leading/trailing whitespace and dots, and caps the length at 200
/// characters while preserving the extension.
///
/// # Examples
///
/// ```
/// use media_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("test<>file.mp4"), "test__file.mp4");
/// assert_eq!(sanitize_filename("  test.mp4  "), "test.mp4");
/// ```
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ' ');

    if cleaned.chars().count() <= MAX_FILENAME_CHARS {
        return cleaned.to_string();
    }

    // Over-long name: keep the extension, truncate the stem by characters
    // so multi-byte sequences are never split
    let (stem, ext) = match cleaned.rfind('.') {
        Some(idx) if idx > 0 => cleaned.split_at(idx),
        _ => (cleaned, ""),
    };
    let budget = MAX_FILENAME_CHARS.saturating_sub(ext.chars().count());
    let truncated: String = stem.chars().take(budget).collect();
    format!("{truncated}{ext}")
}

/// Get a unique path for a file, handling collisions per the configured action
///
/// Returns `None` when the rename should be skipped: either the action is
/// `Skip` and the target exists, or `Rename` exhausted its attempts.
/// For `Rename`, the returned path may carry a ` (1)`, ` (2)`, ... suffix.
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Option<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Some(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                None
            } else {
                Some(path.to_path_buf())
            }
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Some(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str())?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent()?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let candidate = match extension {
                    Some(ext) => parent.join(format!("{stem} ({i}).{ext}")),
                    None => parent.join(format!("{stem} ({i})")),
                };
                if !candidate.exists() {
                    return Some(candidate);
                }
            }

            None
        }
    }
}

/// Format a byte count as a human-readable size string
///
/// # Examples
///
/// ```
/// use media_dl::utils::format_size;
///
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(500), "500.00 B");
/// ```
#[must_use]
pub fn format_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}

/// Format a number of seconds as a short human-readable duration
///
/// # Examples
///
/// ```
/// use media_dl::utils::format_eta;
///
/// assert_eq!(format_eta(90), "1m 30s");
/// assert_eq!(format_eta(3661), "1h 1m");
/// ```
#[must_use]
pub fn format_eta(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Locate the ffmpeg binary
///
/// An explicitly configured path wins; otherwise PATH is searched when
/// `search_path` is enabled. Returns `None` when ffmpeg cannot be found;
/// audio transcode presets will not work in that case, which the engine
/// reports through its capabilities, not as an error.
#[must_use]
pub fn find_ffmpeg(tools: &ToolsConfig) -> Option<PathBuf> {
    if let Some(path) = &tools.ffmpeg_path {
        return Some(path.clone());
    }

    if tools.search_path {
        return which::which("ffmpeg").ok();
    }

    None
}

/// Get available disk space for a given path
///
/// Uses platform-specific APIs to query filesystem statistics:
/// - unix: statvfs
/// - Windows: GetDiskFreeSpaceExW
///
/// # Errors
///
/// Returns an IO error if the underlying system call fails (e.g., the path
/// does not exist) or the platform is unsupported.
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is a valid null-terminated C string, stat is
        // zero-initialized before the call, and the struct is only read
        // after statvfs reports success.
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_bavail is blocks available to unprivileged users,
            // f_frsize the fragment size
            Ok(stat.f_bavail.saturating_mul(stat.f_frsize))
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: wide_path is a valid null-terminated wide string and all
        // output pointers reference properly aligned u64 locals that are
        // only read after the call reports success.
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut _total_bytes: u64 = 0;
            let mut _total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut _total_bytes as *mut u64 as *mut _,
                &mut _total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}
