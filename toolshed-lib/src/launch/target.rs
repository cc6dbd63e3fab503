use crate::error::ToolshedError;
use crate::launch::transfer::LaunchPlan;
use nix::unistd::User;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

// Canonical interpreter locations used when PATH lookup comes up empty.
const PYTHON_FALLBACK: &str = "/usr/bin/python3";
const SHELL_FALLBACK: &str = "/bin/bash";

/// An executable unit selected from a menu, addressed purely by filesystem
/// path. Constructed fresh for every selection, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub path: PathBuf,
    pub extra_args: Vec<String>,
}

/// How a target will be invoked, derived solely from its path suffix or
/// execute bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    /// `.py` script, run through a Python 3 interpreter.
    Python { interpreter: PathBuf },
    /// `.sh` script, run through a shell located on PATH.
    Shell { interpreter: PathBuf },
    /// No known suffix but carries an execute bit; run directly.
    Native,
}

impl LaunchTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(path: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            extra_args,
        }
    }

    /// Decide how this target would be executed. Classification has no
    /// observable side effects; permission fixes are the caller's business
    /// (see [`ensure_executable`]).
    pub fn classify(&self) -> Result<TargetKind, ToolshedError> {
        classify_resolved(&expand_user(&self.path))
    }

    /// Classify and build the concrete launch plan:
    /// argv `[interpreterOrPath, targetPath, ...extraArgs]`.
    pub fn plan(&self) -> Result<LaunchPlan, ToolshedError> {
        let path = expand_user(&self.path);
        let kind = classify_resolved(&path)?;
        let path_str = path.to_string_lossy().into_owned();

        let (program, mut args) = match kind {
            TargetKind::Python { interpreter } | TargetKind::Shell { interpreter } => {
                (interpreter.to_string_lossy().into_owned(), vec![path_str])
            }
            TargetKind::Native => (path_str, Vec::new()),
        };
        args.extend(self.extra_args.iter().cloned());

        Ok(LaunchPlan::new(program, args))
    }
}

fn classify_resolved(path: &Path) -> Result<TargetKind, ToolshedError> {
    if !path.exists() {
        return Err(ToolshedError::TargetNotFound(path.to_path_buf()));
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => Ok(TargetKind::Python {
            interpreter: locate("python3", PYTHON_FALLBACK),
        }),
        Some("sh") => Ok(TargetKind::Shell {
            interpreter: locate("bash", SHELL_FALLBACK),
        }),
        _ => {
            if is_executable(path) {
                Ok(TargetKind::Native)
            } else {
                Err(ToolshedError::UnsupportedTarget(path.to_path_buf()))
            }
        }
    }
}

fn locate(program: &str, fallback: &str) -> PathBuf {
    which::which(program).unwrap_or_else(|_| PathBuf::from(fallback))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Resolve `~` shorthand: bare `~` and `~/...` against the invoking user's
/// home, `~name/...` against that account's home from the user database.
/// Anything unresolvable passes through unchanged and fails the later
/// existence check instead.
pub fn expand_user(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let Some(rest) = text.strip_prefix('~') else {
        return path.to_path_buf();
    };

    if rest.is_empty() || rest.starts_with('/') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
        return path.to_path_buf();
    }

    let (name, tail) = match rest.split_once('/') {
        Some((name, tail)) => (name, tail),
        None => (rest, ""),
    };
    if let Ok(Some(account)) = User::from_name(name) {
        let mut resolved = account.dir;
        let tail = tail.trim_start_matches('/');
        if !tail.is_empty() {
            resolved.push(tail);
        }
        return resolved;
    }
    path.to_path_buf()
}

/// Best-effort execute-bit fix before classification. Failures are
/// deliberately swallowed; a target that stays non-executable is rejected
/// later by the classifier.
pub fn ensure_executable(path: &Path) {
    let path = expand_user(path);
    let Ok(meta) = fs::metadata(&path) else {
        return;
    };
    let mut perms = meta.permissions();
    let mode = perms.mode();
    if mode & 0o111 != 0 {
        return;
    }
    perms.set_mode(mode | 0o111);
    let _ = fs::set_permissions(&path, perms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, mode: u32) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\nexit 0").unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(mode);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn missing_target_is_not_found() {
        let target = LaunchTarget::new("/definitely/not/here.sh");
        match target.classify() {
            Err(ToolshedError::TargetNotFound(path)) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.sh"));
            }
            other => panic!("expected TargetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn shell_suffix_selects_a_shell() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "setup.sh", 0o644);
        match LaunchTarget::new(&path).classify().unwrap() {
            TargetKind::Shell { interpreter } => {
                assert!(interpreter.file_name().unwrap() == "bash");
            }
            other => panic!("expected Shell, got {other:?}"),
        }
    }

    #[test]
    fn python_suffix_selects_python() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "repo.py", 0o644);
        match LaunchTarget::new(&path).classify().unwrap() {
            TargetKind::Python { interpreter } => {
                let name = interpreter.file_name().unwrap().to_string_lossy();
                assert!(name.starts_with("python"), "unexpected interpreter {name}");
            }
            other => panic!("expected Python, got {other:?}"),
        }
    }

    #[test]
    fn interpreter_choice_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "setup.sh", 0o644);
        let target = LaunchTarget::new(&path);
        assert_eq!(target.classify().unwrap(), target.classify().unwrap());
    }

    #[test]
    fn executable_without_suffix_is_native() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "installer", 0o755);
        assert_eq!(
            LaunchTarget::new(&path).classify().unwrap(),
            TargetKind::Native
        );
    }

    #[test]
    fn non_executable_unknown_suffix_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "notes.txt", 0o644);
        match LaunchTarget::new(&path).classify() {
            Err(ToolshedError::UnsupportedTarget(p)) => assert_eq!(p, path),
            other => panic!("expected UnsupportedTarget, got {other:?}"),
        }
    }

    #[test]
    fn plan_for_shell_script_runs_interpreter_first() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "setup.sh", 0o644);
        let plan = LaunchTarget::with_args(&path, vec!["--fast".into()])
            .plan()
            .unwrap();
        assert!(plan.program.ends_with("bash"));
        assert_eq!(
            plan.args,
            vec![path.to_string_lossy().into_owned(), "--fast".to_string()]
        );
    }

    #[test]
    fn plan_for_native_target_runs_it_directly() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "installer", 0o755);
        let plan = LaunchTarget::new(&path).plan().unwrap();
        assert_eq!(plan.program, path.to_string_lossy());
        assert!(plan.args.is_empty());
    }

    #[test]
    fn ensure_executable_sets_the_bits() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "plain", 0o644);
        ensure_executable(&path);
        assert!(is_executable(&path));
    }

    #[test]
    fn ensure_executable_swallows_missing_paths() {
        ensure_executable(Path::new("/definitely/not/here"));
    }

    #[test]
    fn tilde_paths_resolve_against_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user(Path::new("~/x.sh")), home.join("x.sh"));
            assert_eq!(expand_user(Path::new("~")), home);
        }
        assert_eq!(expand_user(Path::new("/a/b.sh")), PathBuf::from("/a/b.sh"));
    }

    #[test]
    fn named_account_shorthand_resolves_that_home() {
        if let Ok(Some(root)) = User::from_name("root") {
            assert_eq!(expand_user(Path::new("~root")), root.dir);
            assert_eq!(expand_user(Path::new("~root/x.sh")), root.dir.join("x.sh"));
        }
        // Unknown accounts pass through so the existence check fails honestly.
        assert_eq!(
            expand_user(Path::new("~no-such-account/x.sh")),
            PathBuf::from("~no-such-account/x.sh")
        );
    }
}
