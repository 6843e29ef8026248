use crate::command::{ExitCode, FALLBACK_STATUS, Host, Invocation};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tracing::{debug, warn};

/// [`Host`] backed by the real process: `chdir(2)` and child processes.
#[derive(Debug, Default)]
pub struct OsHost;

impl Host for OsHost {
    fn change_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        std::env::set_current_dir(dir)
    }

    fn run(&mut self, invocation: Invocation<'_>) -> std::io::Result<ExitCode> {
        let mut cmd = std::process::Command::new(invocation.program);
        cmd.args(invocation.args)
            .env_clear()
            .envs(invocation.env.vars.iter())
            .current_dir(&invocation.env.current_dir)
            .stdin(Stdio::inherit());
        match invocation.output {
            Some(file) => {
                cmd.stdout(file.try_clone()?).stderr(file.try_clone()?);
            }
            None => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }

        let exit_status = cmd.status()?;
        debug!(program = %invocation.program.display(), %exit_status, "child exited");
        Ok(exit_status
            .code()
            .unwrap_or_else(|| terminated_abnormally(exit_status)))
    }
}

fn terminated_abnormally(exit_status: ExitStatus) -> ExitCode {
    warn!(%exit_status, "child did not exit normally");
    FALLBACK_STATUS
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with more than one component (e.g., `bin/sh` or `./foo`): resolved
///   against `current_dir` and returned if it is an executable file.
/// - Single path component (no separators): search each directory in `search_paths`
///   (PATH) in order and return the first executable match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup or relative resolution.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    current_dir: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, _) => None,
        // Single component -> search in PATH
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => {
            let joined = current_dir.join(path);
            find_by_path(&joined).map(|p| Cow::Owned(p.to_owned()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
