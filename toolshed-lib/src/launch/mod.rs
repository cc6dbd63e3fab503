pub mod chain;
pub mod target;
pub mod transfer;

pub use chain::{ChainEnv, ReturnTarget, PREV_SCRIPT_ENV, RETURN_MODE_ENV};
pub use target::{LaunchTarget, TargetKind};
pub use transfer::{LaunchPlan, OsTransfer, RecordingTransfer, Transfer};

/// How control is handed to the next target.
///
/// `Exec` replaces the current process image; on success the calling frame is
/// gone and the call never returns. `Spawn` runs the target as a child and
/// blocks until it exits, after which the caller resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Exec,
    Spawn,
}

impl Default for LaunchMode {
    fn default() -> Self {
        LaunchMode::Exec
    }
}

impl LaunchMode {
    /// Lenient parser for CLI/environment values. Case-insensitive;
    /// anything other than `exec`/`spawn` is `None` so callers can fall
    /// through to the next source.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exec" => Some(LaunchMode::Exec),
            "spawn" => Some(LaunchMode::Spawn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchMode::Exec => "exec",
            LaunchMode::Spawn => "spawn",
        }
    }
}
