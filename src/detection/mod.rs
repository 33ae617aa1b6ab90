//! Installed-program metadata sources.
//!
//! Presence detection by display name needs the list of programs the system
//! considers installed. On Windows that is the uninstall registry; elsewhere
//! it is the freedesktop application entries. Both are exposed through the
//! [`InstalledPrograms`] trait and scanned in a fixed order:
//! machine scope before user scope, primary view before alternate view.

#[cfg(not(windows))]
mod desktop_entries;
#[cfg(windows)]
mod uninstall_registry;

#[cfg(not(windows))]
pub use desktop_entries::DesktopEntries;
#[cfg(windows)]
pub use uninstall_registry::UninstallRegistry;

use strum::IntoEnumIterator;

/// Who a program was installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum Scope {
    Machine,
    User,
}

/// Which of the two locations inside a scope is read.
///
/// On Windows `Alternate` is the 32-bit-on-64-bit redirected view
/// (`WOW6432Node`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum View {
    Primary,
    Alternate,
}

/// Typed failure of a metadata lookup.
///
/// These never escape presence detection; a failed lookup counts as
/// "not detected".
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetectionError {
    /// The location does not exist on this machine.
    NotFound,

    /// Permission denied reading the location.
    PermissionDenied,

    /// Any other I/O or OS error.
    IoError,
}

impl DetectionError {
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Location not found",
            Self::PermissionDenied => "Permission denied",
            Self::IoError => "I/O error during lookup",
        }
    }
}

impl From<std::io::Error> for DetectionError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::IoError,
        }
    }
}

/// A source of installed-program display names.
pub trait InstalledPrograms: Send + Sync {
    /// Display names of every program registered at one location.
    fn display_names(&self, scope: Scope, view: View) -> Result<Vec<String>, DetectionError>;
}

/// The metadata source native to the current platform.
#[cfg(windows)]
pub fn system_programs() -> UninstallRegistry {
    UninstallRegistry
}

/// The metadata source native to the current platform.
#[cfg(not(windows))]
pub fn system_programs() -> DesktopEntries {
    DesktopEntries::system()
}

/// Find the first installed program whose display name contains `needle`,
/// ignoring case.
///
/// Locations are visited machine-primary, machine-alternate, user-primary,
/// user-alternate; the scan stops at the first match. Lookup failures are
/// logged at debug level and skipped.
pub fn find_display_name(source: &dyn InstalledPrograms, needle: &str) -> Option<String> {
    let needle = needle.to_lowercase();
    for scope in Scope::iter() {
        for view in View::iter() {
            match source.display_names(scope, view) {
                Ok(names) => {
                    if let Some(found) = names
                        .into_iter()
                        .find(|name| name.to_lowercase().contains(&needle))
                    {
                        return Some(found);
                    }
                }
                Err(e) => {
                    tracing::debug!(%scope, %view, "skipping program location: {}", e.description());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakePrograms {
        entries: HashMap<(Scope, View), Result<Vec<String>, DetectionError>>,
        visited: Mutex<Vec<(Scope, View)>>,
    }

    impl FakePrograms {
        fn new(entries: Vec<((Scope, View), Result<Vec<String>, DetectionError>)>) -> Self {
            Self {
                entries: entries.into_iter().collect(),
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    impl InstalledPrograms for FakePrograms {
        fn display_names(&self, scope: Scope, view: View) -> Result<Vec<String>, DetectionError> {
            self.visited.lock().unwrap().push((scope, view));
            self.entries
                .get(&(scope, view))
                .cloned()
                .unwrap_or(Err(DetectionError::NotFound))
        }
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let source = FakePrograms::new(vec![(
            (Scope::Machine, View::Primary),
            Ok(vec!["Microsoft Visual Studio Code (User)".to_string()]),
        )]);
        assert_eq!(
            find_display_name(&source, "visual studio CODE").as_deref(),
            Some("Microsoft Visual Studio Code (User)")
        );
    }

    #[test]
    fn test_scan_order_and_short_circuit() {
        let source = FakePrograms::new(vec![
            ((Scope::Machine, View::Primary), Ok(vec!["7-Zip".to_string()])),
            ((Scope::Machine, View::Alternate), Ok(vec!["Steam".to_string()])),
            ((Scope::User, View::Primary), Ok(vec!["Steam (user)".to_string()])),
        ]);
        assert_eq!(find_display_name(&source, "steam").as_deref(), Some("Steam"));
        assert_eq!(
            *source.visited.lock().unwrap(),
            vec![(Scope::Machine, View::Primary), (Scope::Machine, View::Alternate)]
        );
    }

    #[test]
    fn test_failed_locations_are_skipped() {
        let source = FakePrograms::new(vec![
            ((Scope::Machine, View::Primary), Err(DetectionError::PermissionDenied)),
            ((Scope::User, View::Alternate), Ok(vec!["Discord".to_string()])),
        ]);
        assert_eq!(find_display_name(&source, "discord").as_deref(), Some("Discord"));
        assert_eq!(source.visited.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_no_match() {
        let source = FakePrograms::new(vec![]);
        assert!(find_display_name(&source, "anything").is_none());
    }

    #[test]
    fn test_io_error_conversion() {
        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(DetectionError::from(e), DetectionError::PermissionDenied);
        let e = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(DetectionError::from(e), DetectionError::NotFound);
    }
}
