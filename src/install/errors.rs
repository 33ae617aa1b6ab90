//! Error types for installation operations.
//!
//! [`InstallError`] covers everything that can go wrong while installing one
//! item. Each variant carries a `fix` with an actionable suggestion. All of
//! them are caught at the per-item boundary of a batch and turned into a
//! `Failed` result; only batch cancellation ([`Cancelled`]) escapes.

use crate::InstallResult;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while installing a single item.
///
/// # Example
///
/// ```rust
/// use autoinstaller::InstallError;
///
/// let error = InstallError::ProcessExit {
///     program: "wsl".to_string(),
///     exit_code: Some(1),
///     fix: "Run the command manually to see its output".to_string(),
/// };
/// assert_eq!(error.to_string(), "wsl exited with code 1");
/// assert!(error.fix_suggestion().contains("manually"));
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The item's recipe is incomplete, e.g. no download URL for a
    /// download-and-run item.
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is missing or malformed.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Downloading the installer failed.
    ///
    /// Covers connection faults and non-success HTTP responses.
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
        /// HTTP status code, when the server answered.
        status: Option<u16>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The program could not be started at all.
    #[error("Failed to start {program}: {message}")]
    ProcessLaunch {
        /// The program that was being launched.
        program: String,
        /// Why it could not be started.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The program ran but reported failure.
    #[error("{program} exited with {}", describe_exit(*exit_code))]
    ProcessExit {
        /// The program that failed.
        program: String,
        /// Exit code, or `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Elevation was requested on a system with no way to grant it.
    #[error("Elevation unsupported: {message}")]
    ElevationUnsupported {
        /// Why elevation is unavailable.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Unpacking a downloaded archive failed.
    #[error("Failed to extract {}: {message}", archive.display())]
    Extraction {
        /// The archive being extracted.
        archive: PathBuf,
        /// Description of the failure.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// A local file operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The operation was interrupted by batch cancellation.
    #[error("Operation cancelled")]
    Cancelled {
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl InstallError {
    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::Configuration { fix, .. } => fix,
            Self::Network { fix, .. } => fix,
            Self::ProcessLaunch { fix, .. } => fix,
            Self::ProcessExit { fix, .. } => fix,
            Self::ElevationUnsupported { fix, .. } => fix,
            Self::Extraction { fix, .. } => fix,
            Self::Io { fix, .. } => fix,
            Self::Cancelled { fix } => fix,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let fix = if source.kind() == std::io::ErrorKind::PermissionDenied {
            "Run with sufficient permissions for this location".to_string()
        } else {
            "Check that the location exists and has free space".to_string()
        };
        Self::Io {
            path: path.into(),
            source,
            fix,
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::Cancelled {
            fix: "Start the installation again to process the remaining items".to_string(),
        }
    }
}

/// A batch stopped early because cancellation was requested.
///
/// Holds the results recorded before the stop; items after the cancellation
/// point have no result.
#[derive(Debug, Error)]
#[error("Installation cancelled after {} item(s)", completed.len())]
pub struct Cancelled {
    /// Results for the items processed before cancellation, in input order.
    pub completed: Vec<InstallResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_exit_mentions_code() {
        let error = InstallError::ProcessExit {
            program: "msiexec.exe".to_string(),
            exit_code: Some(1603),
            fix: "Check the installer log".to_string(),
        };
        assert!(error.to_string().contains("1603"));
    }

    #[test]
    fn test_process_exit_without_code() {
        let error = InstallError::ProcessExit {
            program: "setup".to_string(),
            exit_code: None,
            fix: "Retry".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "setup exited with no exit code (terminated by signal)"
        );
    }

    #[test]
    fn test_configuration_display() {
        let error = InstallError::Configuration {
            message: "no download URL".to_string(),
            fix: "Add downloadUrl to the catalog entry".to_string(),
        };
        assert_eq!(error.to_string(), "Configuration error: no download URL");
    }

    #[test]
    fn test_io_helper_picks_fix() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = InstallError::io("/opt/FFmpeg", denied);
        assert!(error.fix_suggestion().contains("permissions"));
        assert!(error.to_string().contains("/opt/FFmpeg"));
    }

    #[test]
    fn test_all_variants_have_fix() {
        let errors = vec![
            InstallError::Configuration {
                message: "m".to_string(),
                fix: "Add a URL".to_string(),
            },
            InstallError::Network {
                message: "404".to_string(),
                status: Some(404),
                fix: "Check the URL".to_string(),
            },
            InstallError::ProcessLaunch {
                program: "wsl".to_string(),
                message: "not found".to_string(),
                fix: "Install wsl".to_string(),
            },
            InstallError::ProcessExit {
                program: "wsl".to_string(),
                exit_code: Some(1),
                fix: "Check output".to_string(),
            },
            InstallError::ElevationUnsupported {
                message: "no sudo".to_string(),
                fix: "Run as root".to_string(),
            },
            InstallError::Extraction {
                archive: PathBuf::from("a.zip"),
                message: "corrupt".to_string(),
                fix: "Download again".to_string(),
            },
            InstallError::io("x", std::io::Error::other("boom")),
            InstallError::cancelled(),
        ];

        for error in errors {
            assert!(
                !error.fix_suggestion().is_empty(),
                "fix_suggestion() should return non-empty string for {:?}",
                error
            );
        }
    }

    #[test]
    fn test_cancelled_display() {
        let cancelled = Cancelled {
            completed: vec![InstallResult::new("A", crate::InstallStatus::Success, "ok")],
        };
        assert_eq!(cancelled.to_string(), "Installation cancelled after 1 item(s)");
    }
}
