//! Presence detection: is an item already installed?

use crate::detection::{find_display_name, system_programs, InstalledPrograms};
use crate::SoftwareItem;
use std::sync::Arc;

/// Decides whether a [`SoftwareItem`] is already present on the machine.
///
/// # Detection Process
///
/// 1. If the item's detection rule names a file and that file exists,
///    the item is installed. This skips the costlier metadata scan.
/// 2. Otherwise, if the rule names a display-name substring, scan the
///    installed-program metadata for a case-insensitive match.
/// 3. With neither rule configured the item is never detected.
///
/// Detection has no side effects and never fails: a lookup fault counts as
/// "not detected".
///
/// # Example
///
/// ```rust
/// use autoinstaller::{DetectionRule, PresenceDetector, SoftwareItem};
///
/// let detector = PresenceDetector::new();
/// let item = SoftwareItem::system_command("Shell", "sh", "")
///     .with_detection(DetectionRule::file(std::env::temp_dir()));
/// assert!(detector.is_installed(&item));
/// ```
#[derive(Clone)]
pub struct PresenceDetector {
    programs: Arc<dyn InstalledPrograms>,
}

impl PresenceDetector {
    /// Detector backed by the platform's installed-program metadata.
    pub fn new() -> Self {
        Self::with_programs(Arc::new(system_programs()))
    }

    /// Detector backed by a custom metadata source.
    pub fn with_programs(programs: Arc<dyn InstalledPrograms>) -> Self {
        Self { programs }
    }

    pub fn is_installed(&self, item: &SoftwareItem) -> bool {
        if let Some(path) = item.detection.path() {
            if path.exists() {
                tracing::debug!(item = %item.name, path = %path.display(), "detected by file");
                return true;
            }
        }

        if let Some(needle) = item.detection.display_name_needle() {
            if let Some(found) = find_display_name(self.programs.as_ref(), needle) {
                tracing::debug!(item = %item.name, display_name = %found, "detected by display name");
                return true;
            }
        }

        false
    }

    /// Check every item, off the async runtime's worker threads.
    ///
    /// Returns one flag per input item, in input order. This pass is
    /// independent of installation and may run while the caller is idle.
    pub async fn refresh_installed(&self, items: &[SoftwareItem]) -> Vec<bool> {
        let detector = self.clone();
        let owned = items.to_vec();
        let count = owned.len();
        tokio::task::spawn_blocking(move || {
            owned
                .iter()
                .map(|item| detector.is_installed(item))
                .collect()
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "presence refresh task failed");
            vec![false; count]
        })
    }
}

impl Default for PresenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresenceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceDetector").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectionError, Scope, View};
    use crate::DetectionRule;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts scans and reports one machine-wide program.
    #[derive(Default)]
    struct CountingPrograms {
        scans: AtomicUsize,
    }

    impl InstalledPrograms for CountingPrograms {
        fn display_names(&self, scope: Scope, view: View) -> Result<Vec<String>, DetectionError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            match (scope, view) {
                (Scope::Machine, View::Primary) => Ok(vec!["Git version 2.44.0".to_string()]),
                _ => Err(DetectionError::NotFound),
            }
        }
    }

    fn item(rule: DetectionRule) -> SoftwareItem {
        SoftwareItem::download("Git", "https://example.com/git.exe", "/VERYSILENT").with_detection(rule)
    }

    #[test]
    fn test_file_rule_short_circuits_scan() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("git.exe");
        std::fs::write(&marker, b"").unwrap();

        let programs = Arc::new(CountingPrograms::default());
        let detector = PresenceDetector::with_programs(programs.clone());
        let rule = DetectionRule {
            display_name_contains: Some("Git".to_string()),
            file_path: Some(marker),
        };
        assert!(detector.is_installed(&item(rule)));
        assert_eq!(programs.scans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_file_falls_back_to_display_name() {
        let programs = Arc::new(CountingPrograms::default());
        let detector = PresenceDetector::with_programs(programs.clone());
        let rule = DetectionRule {
            display_name_contains: Some("git".to_string()),
            file_path: Some("/definitely/not/here/git.exe".into()),
        };
        assert!(detector.is_installed(&item(rule)));
        assert_eq!(programs.scans.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display_name_miss() {
        let detector = PresenceDetector::with_programs(Arc::new(CountingPrograms::default()));
        assert!(!detector.is_installed(&item(DetectionRule::display_name("Steam"))));
    }

    #[test]
    fn test_no_rule_is_never_installed() {
        let programs = Arc::new(CountingPrograms::default());
        let detector = PresenceDetector::with_programs(programs.clone());
        assert!(!detector.is_installed(&item(DetectionRule::default())));
        assert_eq!(programs.scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let detector = PresenceDetector::with_programs(Arc::new(CountingPrograms::default()));
        let items = vec![
            item(DetectionRule::display_name("Steam")),
            item(DetectionRule::file(dir.path())),
            item(DetectionRule::display_name("GIT")),
        ];
        assert_eq!(detector.refresh_installed(&items).await, vec![false, true, true]);
    }
}
