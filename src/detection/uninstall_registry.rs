//! Windows uninstall registry as installed-program metadata.

use super::{DetectionError, InstalledPrograms, Scope, View};
use windows::core::{HSTRING, PWSTR};
use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_ITEMS, WIN32_ERROR};
use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegGetValueW, RegOpenKeyExW, HKEY, HKEY_CURRENT_USER,
    HKEY_LOCAL_MACHINE, KEY_READ, RRF_RT_REG_SZ,
};

const UNINSTALL_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";
const UNINSTALL_KEY_WOW64: &str = r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall";

/// Longest registry key name, in UTF-16 units, including the terminator.
const MAX_KEY_NAME: usize = 256;

/// Reads `DisplayName` values under the `Uninstall` keys of `HKLM` and `HKCU`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallRegistry;

/// Closes the wrapped key on drop.
struct RegistryHandle(HKEY);

impl Drop for RegistryHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = RegCloseKey(self.0);
            }
        }
    }
}

fn check(status: WIN32_ERROR) -> Result<(), DetectionError> {
    match status {
        s if s.is_ok() => Ok(()),
        ERROR_FILE_NOT_FOUND => Err(DetectionError::NotFound),
        ERROR_ACCESS_DENIED => Err(DetectionError::PermissionDenied),
        _ => Err(DetectionError::IoError),
    }
}

fn open_key(root: HKEY, path: &str) -> Result<RegistryHandle, DetectionError> {
    let mut key = HKEY::default();
    let status = unsafe { RegOpenKeyExW(root, &HSTRING::from(path), Some(0), KEY_READ, &mut key) };
    check(status)?;
    Ok(RegistryHandle(key))
}

fn subkey_names(key: &RegistryHandle) -> Vec<String> {
    let mut names = Vec::new();
    let mut buffer = [0u16; MAX_KEY_NAME];
    for index in 0.. {
        let mut len = buffer.len() as u32;
        let status = unsafe {
            RegEnumKeyExW(
                key.0,
                index,
                Some(PWSTR(buffer.as_mut_ptr())),
                &mut len,
                None,
                None,
                None,
                None,
            )
        };
        if status == ERROR_NO_MORE_ITEMS {
            break;
        }
        if status.is_ok() {
            names.push(String::from_utf16_lossy(&buffer[..len as usize]));
        }
    }
    names
}

fn display_name(key: &RegistryHandle, subkey: &str) -> Option<String> {
    let subkey = HSTRING::from(subkey);
    let value = HSTRING::from("DisplayName");

    let mut size = 0u32;
    let status = unsafe {
        RegGetValueW(key.0, &subkey, &value, RRF_RT_REG_SZ, None, None, Some(&mut size))
    };
    if status.is_err() || size == 0 {
        return None;
    }

    let mut data = vec![0u16; (size as usize).div_ceil(2)];
    let status = unsafe {
        RegGetValueW(
            key.0,
            &subkey,
            &value,
            RRF_RT_REG_SZ,
            None,
            Some(data.as_mut_ptr().cast()),
            Some(&mut size),
        )
    };
    if status.is_err() {
        return None;
    }

    let end = data.iter().position(|&c| c == 0).unwrap_or(data.len());
    let name = String::from_utf16_lossy(&data[..end]);
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

impl InstalledPrograms for UninstallRegistry {
    fn display_names(&self, scope: Scope, view: View) -> Result<Vec<String>, DetectionError> {
        let root = match scope {
            Scope::Machine => HKEY_LOCAL_MACHINE,
            Scope::User => HKEY_CURRENT_USER,
        };
        let path = match view {
            View::Primary => UNINSTALL_KEY,
            View::Alternate => UNINSTALL_KEY_WOW64,
        };

        let key = open_key(root, path)?;
        Ok(subkey_names(&key)
            .iter()
            .filter_map(|subkey| display_name(&key, subkey))
            .collect())
    }
}
