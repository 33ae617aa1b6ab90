//! Program lookup on PATH with fallback locations.

use std::path::{Path, PathBuf};

/// System directories checked when a program is not on PATH.
#[cfg(not(windows))]
const FALLBACK_PATHS: &[&str] = &["/usr/local/sbin", "/usr/local/bin", "/usr/sbin", "/usr/bin", "/sbin", "/bin"];

/// Find a program by name or path.
///
/// A name containing a path separator is taken as a path and only checked
/// for existence. Bare names are looked up on PATH via the `which` crate
/// (which also applies `PATHEXT` on Windows), then in the platform's system
/// directories.
///
/// # Returns
///
/// `Some(PathBuf)` if the program is found, `None` otherwise.
pub(crate) fn find_program(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.components().count() > 1 || path.is_absolute() {
        return path.exists().then(|| path.to_path_buf());
    }

    if let Ok(found) = which::which(name) {
        return Some(found);
    }

    fallback_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
}

#[cfg(not(windows))]
fn fallback_dirs() -> Vec<PathBuf> {
    FALLBACK_PATHS.iter().map(PathBuf::from).collect()
}

#[cfg(windows)]
fn fallback_dirs() -> Vec<PathBuf> {
    let root = std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    // 32-bit hosts see the native System32 only through Sysnative.
    vec![root.join("System32"), root.join("Sysnative")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_find_common_program() {
        let result = find_program("sh");
        assert!(result.is_some());
        assert!(result.unwrap().exists());
    }

    #[test]
    fn test_find_nonexistent_program() {
        assert!(find_program("definitely_not_a_real_installer_12345").is_none());
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("setup.exe");
        assert!(find_program(file.to_str().unwrap()).is_none());
        std::fs::write(&file, b"").unwrap();
        assert_eq!(find_program(file.to_str().unwrap()), Some(file));
    }
}
