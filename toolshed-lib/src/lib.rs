pub mod catalog;
pub mod config;
pub mod error;
pub mod installer;
pub mod launch;
pub mod privilege;
pub mod scripts;

pub use catalog::{Catalog, Category};
pub use config::Config;
pub use error::ToolshedError;
pub use installer::{InstallReport, PackageInstaller};
pub use launch::{
    ChainEnv, LaunchMode, LaunchPlan, LaunchTarget, OsTransfer, RecordingTransfer, ReturnTarget,
    TargetKind, Transfer,
};
pub use privilege::{current_is_root, ensure_root, Elevation};

use std::path::PathBuf;

/// Process exit codes: 0 for a normal or user-requested exit, 1 when
/// elevation cannot be obtained or on an unexpected failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitCode {
    Success = 0,
    Failure = 1,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Immutable per-process state, constructed once at startup and passed into
/// menu entry points. Nothing here is read from ambient globals afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    /// Explicit config file this process was started with, if any.
    pub config_path: Option<PathBuf>,
    /// Mode used when transitioning to another menu layer.
    pub transition_mode: LaunchMode,
    /// Where the session hands control when the user exits, if anywhere.
    pub return_target: Option<ReturnTarget>,
}

impl Session {
    pub fn new(config: Config, exec_launch: bool, return_target: Option<ReturnTarget>) -> Self {
        let transition_mode = if exec_launch || config.core.exec_launch {
            LaunchMode::Exec
        } else {
            LaunchMode::Spawn
        };

        Self {
            config,
            config_path: None,
            transition_mode,
            return_target,
        }
    }

    /// Record the explicit `--config` override so menu transitions can
    /// forward it to the next layer.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn scripts_root(&self) -> PathBuf {
        self.config.scripts_root()
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.config.catalog_path()
    }

    /// Resolve a script path from a menu table against the scripts root.
    pub fn script(&self, rel: &str) -> PathBuf {
        self.scripts_root().join(rel)
    }

    /// Forward the resolved chain into a child launch, keeping the
    /// return-target convention intact across process boundaries.
    pub fn propagate_chain(&self, plan: &mut LaunchPlan) {
        if let Some(return_target) = &self.return_target {
            return_target.export(plan);
        }
    }
}
