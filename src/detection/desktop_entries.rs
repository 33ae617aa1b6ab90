//! Freedesktop application entries as installed-program metadata.

use super::{DetectionError, InstalledPrograms, Scope, View};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^Name=(.+?)\s*$").expect("Invalid regex pattern"))
}

/// Reads `Name=` from `*.desktop` files.
///
/// Each scope/view pair maps to one applications directory. Only the first
/// `Name=` line of a file is used, which is the untranslated name of the
/// `[Desktop Entry]` group.
#[derive(Debug, Clone)]
pub struct DesktopEntries {
    machine: [Option<PathBuf>; 2],
    user: [Option<PathBuf>; 2],
}

impl DesktopEntries {
    /// The standard system and user application directories.
    pub fn system() -> Self {
        let data = dirs::data_dir();
        Self {
            machine: [
                Some(PathBuf::from("/usr/share/applications")),
                Some(PathBuf::from("/usr/local/share/applications")),
            ],
            user: [
                data.as_ref().map(|d| d.join("applications")),
                data.map(|d| d.join("flatpak/exports/share/applications")),
            ],
        }
    }

    /// Explicit directories, mainly for tests.
    pub fn with_dirs(
        machine: [Option<PathBuf>; 2],
        user: [Option<PathBuf>; 2],
    ) -> Self {
        Self { machine, user }
    }

    fn dir(&self, scope: Scope, view: View) -> Option<&Path> {
        let dirs = match scope {
            Scope::Machine => &self.machine,
            Scope::User => &self.user,
        };
        let index = match view {
            View::Primary => 0,
            View::Alternate => 1,
        };
        dirs[index].as_deref()
    }
}

fn entry_name(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    name_pattern()
        .captures(&content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl InstalledPrograms for DesktopEntries {
    fn display_names(&self, scope: Scope, view: View) -> Result<Vec<String>, DetectionError> {
        let dir = self.dir(scope, view).ok_or(DetectionError::NotFound)?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(_) => continue,
            };
            if path.extension().and_then(|e| e.to_str()) != Some("desktop") {
                continue;
            }
            if let Some(name) = entry_name(&path) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_entry(dir: &Path, file: &str, body: &str) {
        std::fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn test_reads_untranslated_name() {
        let dir = tempfile::tempdir().unwrap();
        write_entry(
            dir.path(),
            "vlc.desktop",
            "[Desktop Entry]\nVersion=1.0\nName=VLC media player\nName[de]=VLC Medienspieler\nExec=vlc\n",
        );
        write_entry(dir.path(), "notes.txt", "Name=Not an entry\n");

        let source = DesktopEntries::with_dirs([Some(dir.path().to_path_buf()), None], [None, None]);
        let names = source.display_names(Scope::Machine, View::Primary).unwrap();
        assert_eq!(names, vec!["VLC media player".to_string()]);
    }

    #[test]
    fn test_missing_directory() {
        let source = DesktopEntries::with_dirs(
            [Some(PathBuf::from("/definitely/not/a/real/applications/dir")), None],
            [None, None],
        );
        assert_eq!(
            source.display_names(Scope::Machine, View::Primary),
            Err(DetectionError::NotFound)
        );
        assert_eq!(
            source.display_names(Scope::User, View::Alternate),
            Err(DetectionError::NotFound)
        );
    }

    #[test]
    fn test_entry_without_name_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_entry(dir.path(), "broken.desktop", "[Desktop Entry]\nExec=true\n");
        let source = DesktopEntries::with_dirs([None, None], [Some(dir.path().to_path_buf()), None]);
        assert!(source.display_names(Scope::User, View::Primary).unwrap().is_empty());
    }
}
