//! Per-item install status and batch results.

use serde::{Deserialize, Serialize};

/// Status of one item during a batch.
///
/// The states form a small machine:
///
/// ```text
/// Pending -> AlreadyInstalled
/// Pending -> [Downloading ->] Installing -> [PostInstall ->] Success
/// any non-terminal state -> Failed
/// ```
///
/// `SystemCommand` items skip `Downloading`. `Skipped` is never produced by
/// the installer itself; front ends use it for items they chose not to run.
///
/// # Example
///
/// ```rust
/// use autoinstaller::InstallStatus;
///
/// assert!(InstallStatus::Failed.is_terminal());
/// assert!(!InstallStatus::Downloading.is_terminal());
/// assert_eq!(InstallStatus::AlreadyInstalled.to_string(), "Already installed");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::Display,
)]
pub enum InstallStatus {
    #[default]
    Pending,
    Downloading,
    Installing,
    #[strum(to_string = "Post-install")]
    PostInstall,
    Success,
    Failed,
    Skipped,
    #[strum(to_string = "Already installed")]
    AlreadyInstalled,
}

impl InstallStatus {
    /// Whether no further transition can follow this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Skipped | Self::AlreadyInstalled
        )
    }

    /// Whether the item ended up present on the machine.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyInstalled)
    }
}

/// Terminal record for one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallResult {
    pub name: String,
    pub status: InstallStatus,
    pub message: String,
}

impl InstallResult {
    pub fn new(name: impl Into<String>, status: InstallStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

/// Counts over a batch's results, for the final summary.
///
/// `skipped` counts both `Skipped` and `AlreadyInstalled` items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl InstallSummary {
    pub fn from_results(results: &[InstallResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut summary, result| {
                match result.status {
                    InstallStatus::Success => summary.succeeded += 1,
                    InstallStatus::Failed => summary.failed += 1,
                    InstallStatus::Skipped | InstallStatus::AlreadyInstalled => {
                        summary.skipped += 1
                    }
                    _ => {}
                }
                summary
            })
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
