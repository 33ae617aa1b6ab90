//! Progress snapshots and installation options.

use std::path::PathBuf;
use std::time::Duration;

/// Message of the tick emitted when an item starts.
pub const MESSAGE_PREPARING: &str = "Preparing";
/// Message of the tick emitted when an item ends, whatever its outcome.
pub const MESSAGE_DONE: &str = "Done";

/// Snapshot of batch progress.
///
/// `overall_percent` is the share of items finished so far (0 to 100). It
/// never decreases within one batch and only moves on item boundaries;
/// download ticks keep it fixed and report their own progress in `message`.
///
/// # Example
///
/// ```rust
/// use autoinstaller::InstallProgress;
///
/// let tick = InstallProgress::new(50.0, "Git", "Downloading 42%");
/// assert_eq!(tick.to_string(), "[ 50%] Git: Downloading 42%");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InstallProgress {
    pub overall_percent: f64,
    /// Name of the active item; empty for batch-level ticks.
    pub current_item: String,
    pub message: String,
}

impl InstallProgress {
    pub fn new(
        overall_percent: f64,
        current_item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            overall_percent,
            current_item: current_item.into(),
            message: message.into(),
        }
    }

    /// Whether this tick reports the end of the batch.
    pub fn is_complete(&self) -> bool {
        self.overall_percent >= 100.0
    }
}

impl std::fmt::Display for InstallProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.current_item.is_empty() {
            write!(f, "[{:>3.0}%] {}", self.overall_percent, self.message)
        } else {
            write!(
                f,
                "[{:>3.0}%] {}: {}",
                self.overall_percent, self.current_item, self.message
            )
        }
    }
}

/// Share of `completed` out of `total`, as a percentage.
///
/// An empty batch counts as complete.
pub(crate) fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// Options controlling where artifacts go and how they are fetched.
///
/// # Example
///
/// ```rust
/// use autoinstaller::InstallOptions;
/// use std::time::Duration;
///
/// let options = InstallOptions::default();
/// assert_eq!(options.download_dir, std::env::temp_dir());
///
/// let options = InstallOptions {
///     connect_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// assert_eq!(options.connect_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Where installer artifacts are downloaded to. Existing files with the
    /// same name are overwritten and nothing is cleaned up afterwards.
    ///
    /// Default: the system temp directory.
    pub download_dir: PathBuf,

    /// Where `.zip` artifacts are unpacked; created if missing.
    ///
    /// Default: `<Program Files>\FFmpeg` on Windows, `/opt/FFmpeg` elsewhere.
    pub archive_dir: PathBuf,

    /// Maximum time to establish a download connection.
    ///
    /// Default: 30 seconds.
    pub connect_timeout: Duration,

    /// `User-Agent` header sent with downloads.
    pub user_agent: String,
}

fn default_archive_dir() -> PathBuf {
    #[cfg(windows)]
    let root = std::env::var_os("ProgramFiles")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));

    #[cfg(not(windows))]
    let root = PathBuf::from("/opt");

    root.join("FFmpeg")
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            download_dir: std::env::temp_dir(),
            archive_dir: default_archive_dir(),
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 4), 0.0);
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(4, 4), 100.0);
        assert_eq!(percent(0, 0), 100.0);
    }

    #[test]
    fn test_display_batch_tick() {
        let tick = InstallProgress::new(100.0, "", MESSAGE_DONE);
        assert_eq!(tick.to_string(), "[100%] Done");
        assert!(tick.is_complete());
    }

    #[test]
    fn test_display_item_tick() {
        let tick = InstallProgress::new(33.333, "Steam", MESSAGE_PREPARING);
        assert_eq!(tick.to_string(), "[ 33%] Steam: Preparing");
        assert!(!tick.is_complete());
    }

    #[test]
    fn test_install_options_default() {
        let opts = InstallOptions::default();
        assert_eq!(opts.connect_timeout, Duration::from_secs(30));
        assert!(opts.archive_dir.ends_with("FFmpeg"));
        assert!(opts.user_agent.starts_with("autoinstaller/"));
    }

    #[test]
    fn test_install_options_clone() {
        let opts = InstallOptions {
            download_dir: PathBuf::from("/tmp/downloads"),
            ..Default::default()
        };
        let cloned = opts.clone();
        assert_eq!(opts.download_dir, cloned.download_dir);
    }
}
