use crate::error::ToolshedError;
use nix::unistd::Uid;
use std::env;
use std::io::{self, IsTerminal};
use std::process::{Command, Stdio};

/// Result of the privilege gate at a menu entry point.
#[derive(Debug)]
pub enum Elevation {
    /// Already running as root; carry on in this process.
    AlreadyRoot,
    /// The whole invocation was re-run under sudo; the caller should exit
    /// with this status without doing anything else.
    Delegated(i32),
}

pub fn current_is_root() -> bool {
    Uid::effective().is_root()
}

/// Ensure the process runs with root privileges, re-invoking itself under
/// `sudo -E` when it does not. `-E` keeps the environment so the
/// return-target chain (`PREV_SCRIPT`/`RETURN_MODE`) survives elevation.
pub fn ensure_root() -> Result<Elevation, ToolshedError> {
    if current_is_root() {
        return Ok(Elevation::AlreadyRoot);
    }

    // sudo needs a terminal to prompt on; without one elevation cannot
    // be obtained at all.
    if !io::stdin().is_terminal() {
        return Err(ToolshedError::PrivilegeDenied);
    }

    eprintln!("Root privileges are required; prompting for sudo...");

    let exe = env::current_exe().map_err(|_| ToolshedError::PrivilegeDenied)?;
    let status = Command::new("sudo")
        .arg("-E")
        .arg(exe)
        .args(env::args_os().skip(1))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|_| ToolshedError::PrivilegeDenied)?;

    Ok(Elevation::Delegated(status.code().unwrap_or(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_reflects_effective_uid() {
        if current_is_root() {
            assert!(matches!(ensure_root(), Ok(Elevation::AlreadyRoot)));
        } else if !io::stdin().is_terminal() {
            // Unprivileged and no terminal to prompt on: denied outright.
            assert!(matches!(
                ensure_root(),
                Err(ToolshedError::PrivilegeDenied)
            ));
        }
        // Unprivileged on a live terminal would prompt for a password;
        // nothing to assert without side effects.
    }
}
