//! External process execution.
//!
//! [`SystemRunner`] launches installers and commands hidden, optionally
//! elevated, and maps the exit code to success or [`InstallError`]. The free
//! functions here build the command lines the installer needs: package-host
//! dispatch for installer databases and the shell wrapper for post-install
//! commands.

use super::path_finder::find_program;
use crate::install::InstallError;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

/// Runs an external program to completion.
///
/// `args` is a single argument string, as written in catalog entries.
/// Exit code 0 is success; anything else is [`InstallError::ProcessExit`].
///
/// Cancellation ends the wait, not the child: a cancelled installer keeps
/// running in the background.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &str,
        requires_admin: bool,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError>;
}

/// A program plus its argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: String,
}

impl Invocation {
    fn new(program: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: args.into().trim().to_string(),
        }
    }
}

/// Wrap `value` in double quotes, escaping quotes and backslashes.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// How to run a downloaded installer artifact.
///
/// Installer databases are handed to the platform's package host rather
/// than executed: `.msi` to `msiexec.exe /i`, `.deb` to `dpkg -i`, `.rpm` to
/// `rpm -i`, `.pkg` to `installer -pkg`. Anything else runs directly with
/// the silent arguments.
///
/// # Example
///
/// ```rust
/// use autoinstaller::installer_invocation;
/// use std::path::Path;
///
/// let inv = installer_invocation(Path::new("/tmp/node.msi"), "/quiet /norestart");
/// assert_eq!(inv.program, "msiexec.exe");
/// assert_eq!(inv.args, r#"/i "/tmp/node.msi" /quiet /norestart"#);
/// ```
pub fn installer_invocation(artifact: &Path, silent_args: &str) -> Invocation {
    let quoted = if cfg!(windows) {
        format!("\"{}\"", artifact.display())
    } else {
        quote(&artifact.to_string_lossy())
    };
    let extension = artifact
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("msi") => Invocation::new("msiexec.exe", format!("/i {quoted} {silent_args}")),
        Some("deb") => Invocation::new("dpkg", format!("-i {quoted} {silent_args}")),
        Some("rpm") => Invocation::new("rpm", format!("-i {quoted} {silent_args}")),
        Some("pkg") => Invocation::new("installer", format!("-pkg {quoted} -target / {silent_args}")),
        _ => Invocation::new(artifact.to_string_lossy(), silent_args),
    }
}

/// Wrap a post-install command line in the platform shell.
pub fn shell_invocation(command: &str) -> Invocation {
    if cfg!(windows) {
        Invocation::new("cmd.exe", format!("/c {command}"))
    } else {
        Invocation::new("sh", format!("-c {}", quote(command)))
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?:"(?:[^"\\]|\\.)*"|'[^']*'|[^\s"']+)+"#).expect("Invalid regex pattern")
    })
}

fn piece_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""((?:[^"\\]|\\.)*)"|'([^']*)'|([^\s"']+)"#).expect("Invalid regex pattern")
    })
}

/// Only `\"` and `\\` are escapes; any other backslash is literal.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Split an argument string into argv entries.
///
/// Whitespace separates arguments. Double quotes group and allow `\"` and
/// `\\` escapes, other backslashes stay as written so `/D="C:\Tools"` keeps
/// its separators; single quotes group literally. Quoted and bare pieces that
/// touch form one argument, so `--dir="C:/Program Files"` stays whole.
pub fn split_args(args: &str) -> Vec<String> {
    token_pattern()
        .find_iter(args)
        .map(|token| {
            piece_pattern()
                .captures_iter(token.as_str())
                .map(|caps| {
                    if let Some(double) = caps.get(1) {
                        unescape(double.as_str())
                    } else {
                        caps.get(2)
                            .or_else(|| caps.get(3))
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_default()
                    }
                })
                .collect()
        })
        .collect()
}

/// Set the executable bits on a downloaded artifact.
#[cfg(unix)]
pub(crate) async fn make_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| InstallError::io(path, e))
}

#[cfg(not(unix))]
pub(crate) async fn make_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}

fn launch_error(program: &str, e: &std::io::Error) -> InstallError {
    let fix = if e.kind() == std::io::ErrorKind::PermissionDenied {
        "Check that the file is executable and not blocked".to_string()
    } else {
        format!("Make sure {program} is installed and on PATH")
    };
    InstallError::ProcessLaunch {
        program: program.to_string(),
        message: e.to_string(),
        fix,
    }
}

fn exit_error(program: &str, exit_code: Option<i32>) -> InstallError {
    InstallError::ProcessExit {
        program: program.to_string(),
        exit_code,
        fix: "Run the installer manually with the same arguments to see its output".to_string(),
    }
}

fn resolve(program: &str) -> Result<std::path::PathBuf, InstallError> {
    find_program(program).ok_or_else(|| InstallError::ProcessLaunch {
        program: program.to_string(),
        message: "program not found".to_string(),
        fix: format!("Make sure {program} is installed and on PATH"),
    })
}

/// Runs programs on the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
mod platform {
    use super::*;
    use std::path::PathBuf;
    use std::process::Stdio;
    use tokio::process::Command;

    /// Helpers that prompt for administrator rights, in preference order.
    const ELEVATION_HELPERS: &[&str] = &["pkexec", "sudo"];

    fn elevate(program: PathBuf, args: Vec<String>) -> Result<(PathBuf, Vec<String>), InstallError> {
        if nix::unistd::geteuid().is_root() {
            return Ok((program, args));
        }
        let helper = ELEVATION_HELPERS
            .iter()
            .find_map(|name| find_program(name))
            .ok_or_else(|| InstallError::ElevationUnsupported {
                message: "no pkexec or sudo available to request administrator rights".to_string(),
                fix: "Run the installer as root, or install sudo or polkit".to_string(),
            })?;

        let mut elevated = Vec::with_capacity(args.len() + 1);
        elevated.push(program.to_string_lossy().into_owned());
        elevated.extend(args);
        Ok((helper, elevated))
    }

    pub(super) async fn run(
        program: &str,
        args: &str,
        requires_admin: bool,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let path = resolve(program)?;
        let argv = split_args(args);
        let (path, argv) = if requires_admin {
            elevate(path, argv)?
        } else {
            (path, argv)
        };

        let mut command = Command::new(&path);
        command
            .args(&argv)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        // Elevation helpers may need the terminal to prompt.
        if !requires_admin {
            command.stdin(Stdio::null());
        }

        tracing::debug!(program = %path.display(), ?argv, requires_admin, "spawning process");
        let mut child = command.spawn().map_err(|e| launch_error(program, &e))?;

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| launch_error(program, &e))?,
            _ = cancel.cancelled() => return Err(InstallError::cancelled()),
        };

        if status.success() {
            Ok(())
        } else {
            Err(exit_error(program, status.code()))
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::*;
    use tokio::process::Command;
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::Threading::{
        GetExitCodeProcess, WaitForSingleObject, CREATE_NO_WINDOW, INFINITE,
    };
    use windows::Win32::UI::Shell::{
        ShellExecuteExW, SEE_MASK_NOASYNC, SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW,
    };
    use windows::Win32::UI::WindowsAndMessaging::SW_HIDE;

    /// Launch through the shell with the `runas` verb, which shows the UAC
    /// prompt, and return the raw process handle.
    fn shell_execute_elevated(program: &str, args: &str) -> Result<isize, InstallError> {
        let verb = HSTRING::from("runas");
        let file = HSTRING::from(program);
        let params = HSTRING::from(args);
        let mut info = SHELLEXECUTEINFOW {
            cbSize: std::mem::size_of::<SHELLEXECUTEINFOW>() as u32,
            fMask: SEE_MASK_NOCLOSEPROCESS | SEE_MASK_NOASYNC,
            lpVerb: PCWSTR(verb.as_ptr()),
            lpFile: PCWSTR(file.as_ptr()),
            lpParameters: PCWSTR(params.as_ptr()),
            nShow: SW_HIDE.0,
            ..Default::default()
        };
        unsafe { ShellExecuteExW(&mut info) }.map_err(|e| InstallError::ProcessLaunch {
            program: program.to_string(),
            message: e.message().to_string(),
            fix: "Accept the administrator prompt, or run the installer from an elevated shell"
                .to_string(),
        })?;
        if info.hProcess.is_invalid() {
            return Err(InstallError::ProcessLaunch {
                program: program.to_string(),
                message: "no process handle returned".to_string(),
                fix: "Run the installer manually".to_string(),
            });
        }
        Ok(info.hProcess.0 as isize)
    }

    fn wait_for_exit(raw: isize) -> Option<i32> {
        let handle = HANDLE(raw as *mut _);
        let mut code = 0u32;
        let ok = unsafe {
            WaitForSingleObject(handle, INFINITE);
            let ok = GetExitCodeProcess(handle, &mut code).is_ok();
            let _ = CloseHandle(handle);
            ok
        };
        ok.then_some(code as i32)
    }

    pub(super) async fn run(
        program: &str,
        args: &str,
        requires_admin: bool,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let path = resolve(program)?;

        let code = if requires_admin {
            let raw = shell_execute_elevated(&path.to_string_lossy(), args)?;
            let wait = tokio::task::spawn_blocking(move || wait_for_exit(raw));
            tokio::select! {
                joined = wait => joined.ok().flatten(),
                _ = cancel.cancelled() => return Err(InstallError::cancelled()),
            }
        } else {
            let mut command = Command::new(&path);
            command
                .raw_arg(args)
                .creation_flags(CREATE_NO_WINDOW.0)
                .kill_on_drop(false);
            let mut child = command.spawn().map_err(|e| launch_error(program, &e))?;
            let status = tokio::select! {
                status = child.wait() => status.map_err(|e| launch_error(program, &e))?,
                _ = cancel.cancelled() => return Err(InstallError::cancelled()),
            };
            status.code()
        };

        match code {
            Some(0) => Ok(()),
            other => Err(exit_error(program, other)),
        }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &str,
        requires_admin: bool,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        platform::run(program, args, requires_admin, cancel).await
    }
}
