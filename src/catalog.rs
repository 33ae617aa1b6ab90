//! Software catalog: loading definitions and tracking per-entry state.
//!
//! The catalog file is a JSON array of [`SoftwareItem`] objects. When it is
//! missing or unreadable the built-in list from [`default_items`] is used.

use crate::event_log::Logger;
use crate::{DetectionRule, InstallStatus, PresenceDetector, SoftwareItem};
use std::collections::HashSet;
use std::path::Path;

/// Category of programming tools and runtimes.
pub const CATEGORY_DEV: &str = "Developer tools";
/// Category of game stores and launchers.
pub const CATEGORY_GAMES: &str = "Gaming platforms";
/// Category of everyday desktop applications.
pub const CATEGORY_GENERAL: &str = "General software";

/// Default catalog file name, looked up next to the executable.
pub const CATALOG_FILE_NAME: &str = "software.json";

const MSG_READY: &str = "Ready";
const MSG_QUEUED: &str = "Queued";

/// Load the catalog at `path`, falling back to [`default_items`].
///
/// A missing file silently selects the built-in list. A file that cannot be
/// read or parsed is reported as a warning through `logger` before falling
/// back. Entries whose name repeats an earlier one (ignoring case) are
/// dropped with a warning.
///
/// # Example
///
/// ```rust,no_run
/// use autoinstaller::{load_catalog, TracingLogger};
/// use std::path::Path;
///
/// # async fn example() {
/// let items = load_catalog(Path::new("software.json"), &TracingLogger).await;
/// println!("{} item(s) available", items.len());
/// # }
/// ```
pub async fn load_catalog(path: &Path, logger: &dyn Logger) -> Vec<SoftwareItem> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no catalog file, using built-in list");
            return default_items();
        }
        Err(e) => {
            logger.warn(&format!(
                "Could not read catalog {}: {e}. Using the built-in list.",
                path.display()
            ));
            return default_items();
        }
    };

    match serde_json::from_str::<Vec<SoftwareItem>>(&text) {
        Ok(items) => dedupe(items, logger),
        Err(e) => {
            logger.warn(&format!(
                "Could not parse catalog {}: {e}. Using the built-in list.",
                path.display()
            ));
            default_items()
        }
    }
}

fn dedupe(items: Vec<SoftwareItem>, logger: &dyn Logger) -> Vec<SoftwareItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.name.to_lowercase());
            if !fresh {
                logger.warn(&format!("Duplicate catalog entry {:?} ignored", item.name));
            }
            fresh
        })
        .collect()
}

/// Look up a built-in definition by name, ignoring case.
pub fn find_default(name: &str) -> Option<SoftwareItem> {
    default_items().into_iter().find(|item| item.has_name(name))
}

/// The built-in catalog.
pub fn default_items() -> Vec<SoftwareItem> {
    let dev = |name: &str, url: &str, args: &str, detect: &str| {
        SoftwareItem::download(name, url, args)
            .with_category(CATEGORY_DEV)
            .with_admin(true)
            .with_detection(DetectionRule::display_name(detect))
    };
    let games = |name: &str, url: &str, args: &str, detect: &str| {
        dev(name, url, args, detect).with_category(CATEGORY_GAMES)
    };
    let general = |name: &str, url: &str, args: &str, detect: &str| {
        dev(name, url, args, detect).with_category(CATEGORY_GENERAL)
    };

    vec![
        SoftwareItem::system_command("WSL", "wsl", "--install")
            .with_category(CATEGORY_DEV)
            .with_admin(true)
            .with_detection(DetectionRule::file(r"C:\Windows\System32\wsl.exe")),
        dev(
            "Visual Studio Code",
            "https://code.visualstudio.com/sha/download?build=stable&os=win32-x64",
            "/verysilent /suppressmsgboxes /norestart",
            "Microsoft Visual Studio Code",
        ),
        dev(
            "Visual Studio Community",
            "https://aka.ms/vs/17/release/vs_Community.exe",
            "--quiet --wait --norestart --nocache",
            "Visual Studio Community",
        ),
        dev(
            "Git",
            "https://github.com/git-for-windows/git/releases/latest/download/Git-64-bit.exe",
            "/VERYSILENT /NORESTART",
            "Git",
        ),
        dev(
            "GitHub Desktop",
            "https://central.github.com/deployments/desktop/desktop/latest/win64",
            "--silent",
            "GitHub Desktop",
        ),
        dev(
            "Python",
            "https://www.python.org/ftp/python/3.12.2/python-3.12.2-amd64.exe",
            "/quiet InstallAllUsers=1 PrependPath=1 Include_test=0",
            "Python 3.",
        )
        .with_post_install([
            "py -m pip install --upgrade pip",
            "py -m pip install numpy requests flask",
        ]),
        dev(
            "Node.js (LTS)",
            "https://nodejs.org/dist/v20.11.1/node-v20.11.1-x64.msi",
            "/quiet /norestart",
            "Node.js",
        ),
        dev(
            "XAMPP",
            "https://downloadsapachefriends.global.ssl.fastly.net/xampp-files/8.2.12/xampp-windows-x64-8.2.12-0-VS16-installer.exe",
            "--mode unattended",
            "XAMPP",
        ),
        dev(
            "Notepad++",
            "https://github.com/notepad-plus-plus/notepad-plus-plus/releases/latest/download/npp.8.6.2.Installer.x64.exe",
            "/S",
            "Notepad++",
        ),
        dev(
            "PowerShell 7",
            "https://github.com/PowerShell/PowerShell/releases/latest/download/PowerShell-7.4.2-win-x64.msi",
            "/quiet /norestart",
            "PowerShell 7",
        ),
        SoftwareItem::download(
            "FFmpeg",
            "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip",
            "",
        )
        .with_category(CATEGORY_DEV)
        .with_admin(true)
        .with_detection(DetectionRule::file(r"C:\Program Files\FFmpeg\bin\ffmpeg.exe")),
        games(
            "Steam",
            "https://cdn.akamai.steamstatic.com/client/installer/SteamSetup.exe",
            "/S",
            "Steam",
        ),
        games(
            "Epic Games Launcher",
            "https://launcher-public-service-prod06.ol.epicgames.com/launcher/api/installer/download/EpicGamesLauncherInstaller.msi",
            "/quiet /norestart",
            "Epic Games Launcher",
        ),
        games(
            "GOG Galaxy",
            "https://webinstallers.gog-statics.com/download/GOG_Galaxy_2.0.exe",
            "/S",
            "GOG GALAXY",
        ),
        games(
            "Ubisoft Connect",
            "https://static3.cdn.ubi.com/orbit/launcher_installer/UbisoftConnectInstaller.exe",
            "/S",
            "Ubisoft Connect",
        ),
        general(
            "Discord",
            "https://discord.com/api/download?platform=win",
            "-s",
            "Discord",
        ),
        general(
            "Brave Browser",
            "https://laptop-updates.brave.com/latest/winx64",
            "/silent /install",
            "Brave",
        ),
        general(
            "VLC Media Player",
            "https://get.videolan.org/vlc/3.0.20/win64/vlc-3.0.20-win64.exe",
            "/S",
            "VLC media player",
        ),
        general(
            "WinRAR",
            "https://www.rarlab.com/rar/winrar-x64-700.exe",
            "/S",
            "WinRAR",
        ),
        general(
            "Total Commander",
            "https://download.ghisler.com/tcmd1110x64.exe",
            "/S",
            "Total Commander",
        ),
    ]
}

/// One catalog item plus the state a front end shows for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub item: SoftwareItem,
    pub selected: bool,
    pub installed: bool,
    pub status: InstallStatus,
    pub message: String,
}

impl CatalogEntry {
    fn new(item: SoftwareItem) -> Self {
        Self {
            item,
            selected: false,
            installed: false,
            status: InstallStatus::Pending,
            message: MSG_READY.to_string(),
        }
    }
}

/// Ordered catalog entries with selection and status bookkeeping.
///
/// # Example
///
/// ```rust
/// use autoinstaller::{default_items, Catalog, CATEGORY_GAMES};
///
/// let mut catalog = Catalog::new(default_items());
/// catalog.select_category(CATEGORY_GAMES);
/// assert!(catalog
///     .selected_items()
///     .iter()
///     .all(|item| item.category == CATEGORY_GAMES));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(items: Vec<SoftwareItem>) -> Self {
        Self {
            entries: items.into_iter().map(CatalogEntry::new).collect(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.item.has_name(name))
    }

    /// Distinct categories in first-appearance order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !categories.contains(&entry.item.category.as_str()) {
                categories.push(&entry.item.category);
            }
        }
        categories
    }

    pub fn select_all(&mut self) {
        for entry in &mut self.entries {
            entry.selected = true;
        }
    }

    /// Select exactly the entries of `category` (ignoring case) and deselect
    /// the rest. Returns how many are selected.
    pub fn select_category(&mut self, category: &str) -> usize {
        let wanted = category.to_lowercase();
        let mut count = 0;
        for entry in &mut self.entries {
            entry.selected = entry.item.category.to_lowercase() == wanted;
            count += usize::from(entry.selected);
        }
        count
    }

    /// Add the named entries to the selection.
    ///
    /// Returns the names that matched no entry.
    pub fn select_names<I, S>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unknown = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.entries.iter_mut().find(|entry| entry.item.has_name(name)) {
                Some(entry) => entry.selected = true,
                None => unknown.push(name.to_string()),
            }
        }
        unknown
    }

    /// Items of the selected entries, in catalog order.
    pub fn selected_items(&self) -> Vec<SoftwareItem> {
        self.entries
            .iter()
            .filter(|entry| entry.selected)
            .map(|entry| entry.item.clone())
            .collect()
    }

    /// Reset selected entries to `Pending` ahead of a batch.
    pub fn mark_queued(&mut self) {
        for entry in self.entries.iter_mut().filter(|entry| entry.selected) {
            entry.status = InstallStatus::Pending;
            entry.message = MSG_QUEUED.to_string();
        }
    }

    /// Record a status reported by the installer. `Success` also marks the
    /// entry installed. Unknown names are ignored.
    pub fn apply_status(&mut self, name: &str, status: InstallStatus, message: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.item.has_name(name)) {
            entry.status = status;
            entry.message = message.to_string();
            if status == InstallStatus::Success {
                entry.installed = true;
            }
        }
    }

    /// Re-run presence detection for every entry.
    pub async fn refresh_installed(&mut self, detector: &PresenceDetector) {
        let items: Vec<SoftwareItem> = self.entries.iter().map(|entry| entry.item.clone()).collect();
        let flags = detector.refresh_installed(&items).await;
        for (entry, installed) in self.entries.iter_mut().zip(flags) {
            entry.installed = installed;
        }
    }
}
