//! Archive artifacts: unpacked instead of executed.

use crate::install::InstallError;
use std::path::Path;

/// Whether an artifact is an archive to extract rather than run.
pub(crate) fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Unpack a `.zip` artifact into `target`, creating it if needed.
///
/// Existing files in `target` are overwritten. The archive is read on the
/// blocking pool; an entry whose path would escape `target` fails the
/// extraction.
pub(crate) async fn extract_zip(archive: &Path, target: &Path) -> Result<(), InstallError> {
    tokio::fs::create_dir_all(target)
        .await
        .map_err(|e| InstallError::io(target, e))?;

    let archive_path = archive.to_path_buf();
    let target_path = target.to_path_buf();
    let joined = tokio::task::spawn_blocking(move || unpack(&archive_path, &target_path)).await;

    match joined {
        Ok(result) => result.map_err(|message| InstallError::Extraction {
            archive: archive.to_path_buf(),
            message,
            fix: "Download the archive again; it may be incomplete or corrupt".to_string(),
        }),
        Err(e) => Err(InstallError::Extraction {
            archive: archive.to_path_buf(),
            message: format!("extraction task failed: {e}"),
            fix: "Retry the installation".to_string(),
        }),
    }
}

fn unpack(archive: &Path, target: &Path) -> Result<(), String> {
    let file = std::fs::File::open(archive).map_err(|e| e.to_string())?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| e.to_string())?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| format!("entry {:?} escapes the target directory", entry.name()))?;
        let out = target.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| e.to_string())?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let mut file = std::fs::File::create(&out).map_err(|e| format!("{}: {e}", out.display()))?;
        std::io::copy(&mut entry, &mut file).map_err(|e| e.to_string())?;
    }
    Ok(())
}
