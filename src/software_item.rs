//! Software item definitions: the immutable install plan for one package.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How an item gets onto the machine.
///
/// `DownloadAndRun` fetches an installer artifact and executes (or extracts)
/// it. `SystemCommand` runs an already-present system command such as
/// `wsl --install`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum InstallMethod {
    /// Download the artifact from `download_url`, then run or extract it.
    #[default]
    DownloadAndRun,
    /// Run `command` with `command_args`.
    SystemCommand,
}

/// Condition deciding that an item is already installed.
///
/// Both rules may be set. The file path is checked first because it is
/// cheap; the display-name scan only runs when the path is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRule {
    /// Case-insensitive substring of an installed program's display name.
    #[serde(
        rename = "detectDisplayNameContains",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name_contains: Option<String>,

    /// A path whose existence implies the item is installed.
    #[serde(
        rename = "detectFilePath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub file_path: Option<PathBuf>,
}

impl DetectionRule {
    /// Rule matching a display-name substring.
    pub fn display_name(needle: impl Into<String>) -> Self {
        Self {
            display_name_contains: Some(needle.into()),
            file_path: None,
        }
    }

    /// Rule matching the existence of a file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            display_name_contains: None,
            file_path: Some(path.into()),
        }
    }

    /// True when neither rule is configured (blank strings count as unset).
    pub fn is_empty(&self) -> bool {
        self.display_name_needle().is_none() && self.path().is_none()
    }

    pub(crate) fn display_name_needle(&self) -> Option<&str> {
        self.display_name_contains
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub(crate) fn path(&self) -> Option<&std::path::Path> {
        self.file_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Identity and install recipe for one software package.
///
/// Items are plain values. The installer never mutates them; status changes
/// flow out through the status callback and the caller owns whatever
/// presentation state it keeps per item.
///
/// # Example
///
/// ```rust
/// use autoinstaller::{DetectionRule, InstallMethod, SoftwareItem};
///
/// let item = SoftwareItem::download("VLC", "https://example.com/vlc.exe", "/S")
///     .with_category("General software")
///     .with_detection(DetectionRule::display_name("VLC media player"));
/// assert_eq!(item.install_method, InstallMethod::DownloadAndRun);
/// assert!(item.has_name("vlc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareItem {
    /// Unique key, compared case-insensitively.
    pub name: String,

    /// Grouping label used for bulk selection.
    #[serde(default)]
    pub category: String,

    /// Where the installer artifact is fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Arguments that make the installer run without interaction.
    #[serde(default)]
    pub silent_args: String,

    /// Whether every process launched for this item needs elevation.
    #[serde(default)]
    pub requires_admin: bool,

    #[serde(default)]
    pub install_method: InstallMethod,

    /// Program run for [`InstallMethod::SystemCommand`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_args: Option<String>,

    #[serde(flatten)]
    pub detection: DetectionRule,

    /// Shell commands run in order after a successful install.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install_commands: Vec<String>,
}

impl SoftwareItem {
    /// An item installed by downloading and running `url`.
    pub fn download(
        name: impl Into<String>,
        url: impl Into<String>,
        silent_args: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            download_url: Some(url.into()),
            silent_args: silent_args.into(),
            requires_admin: false,
            install_method: InstallMethod::DownloadAndRun,
            command: None,
            command_args: None,
            detection: DetectionRule::default(),
            post_install_commands: Vec::new(),
        }
    }

    /// An item installed by running a system command.
    pub fn system_command(
        name: impl Into<String>,
        command: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        Self {
            download_url: None,
            install_method: InstallMethod::SystemCommand,
            command: Some(command.into()),
            command_args: Some(args.into()),
            ..Self::download(name, String::new(), String::new())
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_detection(mut self, detection: DetectionRule) -> Self {
        self.detection = detection;
        self
    }

    pub fn with_admin(mut self, requires_admin: bool) -> Self {
        self.requires_admin = requires_admin;
        self
    }

    pub fn with_post_install<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_install_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// The download URL, if set and not blank.
    pub fn download_source(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
