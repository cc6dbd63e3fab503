use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the launch machinery and the privilege gate.
///
/// Everything here is non-fatal to an enclosing menu loop (the loop reports
/// and redisplays) except `PrivilegeDenied` at process start, which callers
/// must treat as fatal.
#[derive(Debug, Error)]
pub enum ToolshedError {
    #[error("target not found: {0}")]
    TargetNotFound(PathBuf),

    #[error("no recognized interpreter and not executable: {0}")]
    UnsupportedTarget(PathBuf),

    #[error("transfer failed for `{command}`: {source}")]
    TransferFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("root privileges required and elevation was not obtained")]
    PrivilegeDenied,
}

impl ToolshedError {
    /// True for the error kinds a menu loop should swallow and report
    /// rather than propagate.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ToolshedError::PrivilegeDenied)
    }
}
