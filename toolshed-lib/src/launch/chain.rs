use crate::error::ToolshedError;
use crate::launch::target::{self, LaunchTarget};
use crate::launch::transfer::{LaunchPlan, Transfer};
use crate::launch::LaunchMode;
use std::env;
use std::path::{Path, PathBuf};

/// Environment key carrying the return-target path across processes.
pub const PREV_SCRIPT_ENV: &str = "PREV_SCRIPT";
/// Environment key carrying the return-target launch mode across processes.
pub const RETURN_MODE_ENV: &str = "RETURN_MODE";

/// Snapshot of the chain-relevant environment, taken once at process start.
/// Tests build this directly instead of mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct ChainEnv {
    pub prev_script: Option<String>,
    pub return_mode: Option<String>,
}

impl ChainEnv {
    pub fn capture() -> Self {
        Self {
            prev_script: env::var(PREV_SCRIPT_ENV).ok(),
            return_mode: env::var(RETURN_MODE_ENV).ok(),
        }
    }
}

/// What the current menu session hands control to when it ends.
///
/// Resolved once at process start and immutable afterwards; forwarded to
/// every child launch via [`ReturnTarget::export`] so the chain survives
/// exec-replacement boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnTarget {
    pub path: PathBuf,
    pub mode: LaunchMode,
}

impl ReturnTarget {
    /// Resolution order for the path: CLI pair, then `PREV_SCRIPT`, then
    /// none. The mode resolves independently: CLI pair, then `RETURN_MODE`,
    /// then `Exec`; unrecognized values fall through to the next source.
    pub fn resolve(
        cli_path: Option<&Path>,
        cli_mode: Option<&str>,
        env: &ChainEnv,
    ) -> Option<Self> {
        let path = cli_path.map(Path::to_path_buf).or_else(|| {
            env.prev_script
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })?;

        Some(Self {
            path,
            mode: resolve_mode(cli_mode, env),
        })
    }

    /// Forward the chain into a child's environment.
    pub fn export(&self, plan: &mut LaunchPlan) {
        plan.env_var(PREV_SCRIPT_ENV, self.path.to_string_lossy().into_owned());
        plan.env_var(RETURN_MODE_ENV, self.mode.as_str());
    }

    /// Hand control to this target as the session ends, using the target's
    /// own mode. A returned error means the hand-off did not happen; the
    /// caller reports it and terminates normally regardless.
    pub fn hand_off(&self, transfer: &mut dyn Transfer) -> Result<(), ToolshedError> {
        target::ensure_executable(&self.path);
        let plan = LaunchTarget::new(&self.path).plan()?;
        match self.mode {
            LaunchMode::Exec => transfer.exec(&plan),
            LaunchMode::Spawn => transfer.spawn(&plan).map(|_| ()),
        }
    }
}

fn resolve_mode(cli_mode: Option<&str>, env: &ChainEnv) -> LaunchMode {
    cli_mode
        .and_then(LaunchMode::parse)
        .or_else(|| env.return_mode.as_deref().and_then(LaunchMode::parse))
        .unwrap_or_default()
}
